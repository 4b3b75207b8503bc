//! Row encoding and segment compression
//!
//! The row encoding is pluggable so the engine stays agnostic to payload
//! shape; the default encodes the row list with bincode. Sealed segments
//! are compressed as a whole with lz4.

use crate::{Result, Row, TideError};

/// Pluggable row-list encoding
///
/// The engine always supplies and expects ascending row lists; the codec
/// makes no ordering guarantees of its own.
pub trait RowCodec: Send {
    /// Encode a row list to bytes
    fn encode_rows(&self, rows: &[Row]) -> Result<Vec<u8>>;

    /// Decode a row list from bytes
    fn decode_rows(&self, bytes: &[u8]) -> Result<Vec<Row>>;
}

/// Default codec: bincode over the row list
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeCodec;

impl RowCodec for BincodeCodec {
    fn encode_rows(&self, rows: &[Row]) -> Result<Vec<u8>> {
        bincode::serialize(rows).map_err(|e| TideError::CorruptSegment(e.to_string()))
    }

    fn decode_rows(&self, bytes: &[u8]) -> Result<Vec<Row>> {
        bincode::deserialize(bytes).map_err(|e| TideError::CorruptSegment(e.to_string()))
    }
}

/// Compress a segment image (size-prepended lz4 block)
pub fn compress(bytes: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(bytes)
}

/// Decompress a segment image
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    lz4_flex::decompress_size_prepended(bytes)
        .map_err(|e| TideError::CorruptSegment(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_rows() {
        let rows = vec![Row::new(1, b"one".to_vec()), Row::new(2, b"two".to_vec())];

        let codec = BincodeCodec;
        let encoded = codec.encode_rows(&rows).unwrap();
        let decoded = codec.decode_rows(&encoded).unwrap();
        assert_eq!(decoded, rows);
    }

    #[test]
    fn test_decode_malformed() {
        let codec = BincodeCodec;
        let result = codec.decode_rows(&[0xFF; 3]);
        assert!(matches!(result, Err(TideError::CorruptSegment(_))));
    }

    #[test]
    fn test_compress_roundtrip() {
        let data = b"repetitive repetitive repetitive repetitive".to_vec();
        let compressed = compress(&data);
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_decompress_garbage() {
        let result = decompress(&[0xAB, 0xCD, 0xEF]);
        assert!(matches!(result, Err(TideError::CorruptSegment(_))));
    }
}

//! Active buffer: unsealed rows plus the on-disk `current` file
//!
//! The buffer accumulates appended rows in memory until rotation seals
//! them into a segment. Its content is mirrored to the `current` file on
//! flush so an unsealed tail survives a restart.
//!
//! `current` file format:
//! - 4 bytes: CRC32 of the encoded rows (little endian)
//! - N bytes: the codec's uncompressed row encoding

use crate::codec::RowCodec;
use crate::{Result, Row, TideError, Timestamp};
use bytes::{Buf, BufMut, BytesMut};
use std::fs;
use std::path::Path;

/// File name of the active buffer mirror
pub const CURRENT_FILE: &str = "current";

/// In-memory unsealed rows, ascending by timestamp
#[derive(Debug, Default)]
pub struct ActiveBuffer {
    rows: Vec<Row>,
    size_bytes: usize,
}

impl ActiveBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a buffer from recovered rows
    ///
    /// `size_bytes` is the recovered file's byte size, which stands in
    /// for the running estimate until the next rotation.
    pub fn from_rows(rows: Vec<Row>, size_bytes: usize) -> Self {
        Self { rows, size_bytes }
    }

    /// Timestamp of the oldest unsealed row
    pub fn first_timestamp(&self) -> Option<Timestamp> {
        self.rows.first().map(|r| r.timestamp)
    }

    /// Timestamp of the newest unsealed row
    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.rows.last().map(|r| r.timestamp)
    }

    /// Estimated encoded size in bytes
    pub fn size(&self) -> usize {
        self.size_bytes
    }

    /// Number of unsealed rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Unsealed rows in ascending order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Add a row
    ///
    /// The caller guarantees `row.timestamp` is not behind the store
    /// watermark; the buffer itself does not re-check.
    pub fn push(&mut self, row: Row) {
        self.size_bytes += row.size() + crate::config::ROW_OVERHEAD;
        self.rows.push(row);
    }

    /// Empty the buffer, returning its rows in ascending order
    pub fn take_rows(&mut self) -> Vec<Row> {
        self.size_bytes = 0;
        std::mem::take(&mut self.rows)
    }
}

/// Rewrite the `current` file with the given rows
///
/// The file is replaced wholesale; two flushes with no intervening
/// append produce byte-identical content.
pub fn write_current(dir: &Path, codec: &dyn RowCodec, rows: &[Row]) -> Result<()> {
    let encoded = codec.encode_rows(rows)?;

    let mut buf = BytesMut::with_capacity(4 + encoded.len());
    buf.put_u32_le(crc32fast::hash(&encoded));
    buf.put_slice(&encoded);

    fs::write(dir.join(CURRENT_FILE), &buf)?;
    Ok(())
}

/// Read the `current` file back, validating its checksum
///
/// Returns `Ok(None)` when the file is missing or empty; a checksum or
/// decode failure is surfaced as corruption. On success also returns the
/// file's byte size for buffer size bookkeeping.
pub fn read_current(dir: &Path, codec: &dyn RowCodec) -> Result<Option<(Vec<Row>, usize)>> {
    let path = dir.join(CURRENT_FILE);
    let data = match fs::read(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if data.is_empty() {
        return Ok(None);
    }
    if data.len() < 4 {
        return Err(TideError::CorruptSegment(
            "current file shorter than its checksum".into(),
        ));
    }

    let mut cursor: &[u8] = &data;
    let expected = cursor.get_u32_le();
    let actual = crc32fast::hash(cursor);
    if expected != actual {
        return Err(TideError::CorruptSegment(format!(
            "current file checksum mismatch: expected {:08x}, got {:08x}",
            expected, actual
        )));
    }

    let rows = codec.decode_rows(cursor)?;
    Ok(Some((rows, data.len())))
}

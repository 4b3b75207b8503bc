//! Segment catalog: filename scheme, directory scan, lazy segment access
//!
//! The catalog has no state of its own. Sealed segments are discovered by
//! re-scanning the store directory on every call, so listings are always
//! consistent with the current directory contents at the cost of one scan
//! per query.

use crate::codec::{self, RowCodec};
use crate::{Result, Row, Timestamp};
use std::fs;
use std::path::{Path, PathBuf};

/// File extension for sealed segments
pub const SEGMENT_EXT: &str = "lz4";

/// Build the filename for a segment covering `[first, last]`
///
/// Both bounds are zero-padded to 16 digits so lexicographic filename
/// order equals numeric order. Timestamps above 10^16 - 1 would break
/// that equivalence; callers must stay within it.
pub fn segment_file_name(first: Timestamp, last: Timestamp) -> String {
    format!("segment_{:016}-{:016}.{}", first, last, SEGMENT_EXT)
}

/// Handle to one sealed segment
///
/// Holds only the key range decoded from the filename; the content is
/// read, decompressed, and decoded on [`SegmentHandle::open`], never at
/// discovery time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentHandle {
    /// Smallest timestamp in the segment
    pub first_timestamp: Timestamp,
    /// Largest timestamp in the segment
    pub last_timestamp: Timestamp,
    path: PathBuf,
}

impl SegmentHandle {
    /// Get the segment's file name
    pub fn identifier(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Get the segment's path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the segment's rows in ascending order
    pub fn open(&self, codec: &dyn RowCodec) -> Result<Vec<Row>> {
        let raw = fs::read(&self.path)?;
        let bytes = codec::decompress(&raw)?;
        codec.decode_rows(&bytes)
    }
}

/// List sealed segments, newest first (descending `first_timestamp`)
///
/// Files that do not match the segment naming pattern are ignored.
pub fn list_segments(dir: &Path) -> Result<Vec<SegmentHandle>> {
    let mut segments = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if let Some((first, last)) = parse_segment_name(name) {
                segments.push(SegmentHandle {
                    first_timestamp: first,
                    last_timestamp: last,
                    path,
                });
            }
        }
    }

    segments.sort_by(|a, b| b.first_timestamp.cmp(&a.first_timestamp));

    Ok(segments)
}

fn parse_segment_name(name: &str) -> Option<(Timestamp, Timestamp)> {
    let suffix = format!(".{}", SEGMENT_EXT);
    let stem = name.strip_prefix("segment_")?.strip_suffix(&suffix)?;
    let (first, last) = stem.split_once('-')?;
    if first.len() != 16 || last.len() != 16 {
        return None;
    }
    Some((first.parse().ok()?, last.parse().ok()?))
}

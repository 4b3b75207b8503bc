//! Query engine: ordered merge across the buffer and sealed segments
//!
//! Both query paths work over a unified log list built from the active
//! buffer (as a pseudo-segment) and the sealed segments. Sources never
//! overlap in key range and each contributes an ascending run, so
//! concatenating per-source results in chronological source order yields
//! a globally ascending result without a sort.
//!
//! Query bounds and point keys are `f64` so callers can use fractional
//! inclusive boundaries between integer row keys.

use crate::catalog::SegmentHandle;
use crate::codec::RowCodec;
use crate::{Result, Row, Timestamp};
use std::collections::HashMap;

/// One queryable source: the active buffer or a sealed segment
pub enum LogSource<'a> {
    /// The active buffer's rows, ascending
    Buffer(&'a [Row]),
    /// A sealed segment, opened lazily
    Sealed(SegmentHandle),
}

impl LogSource<'_> {
    /// Smallest timestamp the source holds
    pub fn first_timestamp(&self) -> Timestamp {
        match self {
            LogSource::Buffer(rows) => rows.first().map(|r| r.timestamp).unwrap_or(0),
            LogSource::Sealed(handle) => handle.first_timestamp,
        }
    }

    /// Largest timestamp the source holds
    pub fn last_timestamp(&self) -> Timestamp {
        match self {
            LogSource::Buffer(rows) => rows.last().map(|r| r.timestamp).unwrap_or(0),
            LogSource::Sealed(handle) => handle.last_timestamp,
        }
    }

    /// Check if the source's key range intersects `[from, to]`
    fn overlaps(&self, from: f64, to: f64) -> bool {
        self.first_timestamp() as f64 <= to && self.last_timestamp() as f64 >= from
    }

    /// Check if the source's key range contains `key`
    fn contains(&self, key: f64) -> bool {
        self.first_timestamp() as f64 <= key && key <= self.last_timestamp() as f64
    }

    fn rows(&self, codec: &dyn RowCodec) -> Result<Vec<Row>> {
        match self {
            LogSource::Buffer(rows) => Ok(rows.to_vec()),
            LogSource::Sealed(handle) => handle.open(codec),
        }
    }
}

/// Build the unified log list in ascending chronological order
///
/// `segments` arrive newest-first from the catalog; the buffer, when
/// non-empty, is the newest source of all.
pub fn unified_sources(buffer: &[Row], segments: Vec<SegmentHandle>) -> Vec<LogSource<'_>> {
    let mut sources = Vec::with_capacity(segments.len() + 1);

    if !buffer.is_empty() {
        sources.push(LogSource::Buffer(buffer));
    }
    for handle in segments {
        sources.push(LogSource::Sealed(handle));
    }
    sources.reverse();

    sources
}

/// Collect all rows with `from <= timestamp <= to`, ascending
///
/// Sources whose range does not overlap the bounds are skipped without
/// being opened.
pub fn query_range(
    sources: &[LogSource<'_>],
    codec: &dyn RowCodec,
    from: f64,
    to: f64,
) -> Result<Vec<Row>> {
    let mut out = Vec::new();

    for source in sources {
        if !source.overlaps(from, to) {
            continue;
        }
        for row in source.rows(codec)? {
            let ts = row.timestamp as f64;
            if from <= ts && ts <= to {
                out.push(row);
            }
        }
    }

    Ok(out)
}

/// Resolve each key to its payload, preserving request order
///
/// Keys are grouped by owning source so no source is opened more than
/// once. Keys outside every source's range, fractional keys, and keys
/// falling in a gap resolve to `None`.
pub fn query_multiple(
    sources: &[LogSource<'_>],
    codec: &dyn RowCodec,
    keys: &[f64],
) -> Result<Vec<Option<Vec<u8>>>> {
    // Group request indices by the (at most one) source owning each key
    let mut by_source: HashMap<usize, Vec<usize>> = HashMap::new();
    for (key_idx, &key) in keys.iter().enumerate() {
        if let Some(source_idx) = sources.iter().position(|s| s.contains(key)) {
            by_source.entry(source_idx).or_default().push(key_idx);
        }
    }

    let mut results: Vec<Option<Vec<u8>>> = vec![None; keys.len()];

    for (source_idx, key_idxs) in by_source {
        let lookup: HashMap<Timestamp, Vec<u8>> = sources[source_idx]
            .rows(codec)?
            .into_iter()
            .map(|row| (row.timestamp, row.payload))
            .collect();

        for key_idx in key_idxs {
            let key = keys[key_idx];
            // Only exact integer keys can match a row
            if key.fract() != 0.0 || key < 0.0 {
                continue;
            }
            results[key_idx] = lookup.get(&(key as Timestamp)).cloned();
        }
    }

    Ok(results)
}

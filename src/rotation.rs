//! Rotation and retention: sealing the buffer, pruning old segments
//!
//! Sealing runs synchronously inside the triggering append; the append
//! does not complete until the segment file is on disk.

use crate::buffer::{self, ActiveBuffer};
use crate::catalog;
use crate::codec::{self, RowCodec};
use crate::Result;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Temp name used while a segment image is being written
const SEGMENT_TMP: &str = ".segment.tmp";

/// Seal the buffer's rows into a new immutable segment file
///
/// The image is written under a temp name and renamed into place, so a
/// catalog scan never observes a partially written segment. The buffer
/// is reset only after the rename succeeds; any failure propagates with
/// the buffer intact. After sealing, the `current` file is rewritten to
/// the now-empty buffer so a crash cannot resurrect rows that already
/// live in the segment.
///
/// A no-op when the buffer is empty.
pub fn seal(dir: &Path, codec: &dyn RowCodec, buffer: &mut ActiveBuffer) -> Result<()> {
    let (first, last) = match (buffer.first_timestamp(), buffer.last_timestamp()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Ok(()),
    };

    let encoded = codec.encode_rows(buffer.rows())?;
    let compressed = codec::compress(&encoded);

    let name = catalog::segment_file_name(first, last);
    let tmp_path = dir.join(SEGMENT_TMP);
    fs::write(&tmp_path, &compressed)?;
    fs::rename(&tmp_path, dir.join(&name))?;

    let sealed = buffer.take_rows();
    buffer::write_current(dir, codec, &[])?;

    info!(
        "sealed {} rows into {} ({} bytes compressed)",
        sealed.len(),
        name,
        compressed.len()
    );

    Ok(())
}

/// Keep the newest `max_segments` sealed segments, delete the rest
///
/// Deletion failures are logged and ignored; they do not affect the
/// correctness of retained data.
pub fn enforce_retention(dir: &Path, max_segments: usize) -> Result<()> {
    let segments = catalog::list_segments(dir)?;

    for stale in segments.iter().skip(max_segments) {
        match fs::remove_file(stale.path()) {
            Ok(()) => info!("retention dropped segment {}", stale.identifier()),
            Err(e) => warn!(
                "failed to delete expired segment {}: {}",
                stale.identifier(),
                e
            ),
        }
    }

    Ok(())
}

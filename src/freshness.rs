//! Incremental-rebuild decision for a single document.
//!
//! Rendering a page is cheap, but recipe pages fan out into PDF typesetting
//! jobs, so skipping fresh outputs keeps repeat builds near-instant. The rule
//! is a per-file, single-dependency mtime comparison: a page is rebuilt only
//! when its own output is missing or older than its own source.
//!
//! # Known limitation (intentional)
//!
//! Template or configuration changes do not trigger rebuilds, and the
//! document content hash is not consulted — the check is mtime-only by
//! design. Use `--force` after editing templates.

use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Decide whether `output` must be regenerated from `source`.
///
/// Returns true when `force` is set, when the output does not exist, or when
/// the output's modification time is strictly older than the source's.
/// An output that is same-age-or-newer is skipped.
pub fn should_rebuild(source: &Path, output: &Path, force: bool) -> io::Result<bool> {
    if force {
        return Ok(true);
    }
    let output_mtime = match std::fs::metadata(output) {
        Ok(meta) => meta.modified()?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e),
    };
    let source_mtime = std::fs::metadata(source)?.modified()?;
    Ok(output_mtime < source_mtime)
}

/// Helper for tests and the watch loop: set a file's mtime explicitly.
#[allow(dead_code)]
pub(crate) fn set_mtime(path: &Path, time: SystemTime) -> io::Result<()> {
    std::fs::File::options()
        .write(true)
        .open(path)?
        .set_modified(time)
}

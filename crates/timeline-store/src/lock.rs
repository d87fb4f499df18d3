//! Cross-process guard for a case's `events.db`.
//!
//! The in-process mutex in [`crate::EventStore`] only serializes writers that
//! share one store. Ingest, tag and rebuild runs in separate processes take
//! this lock first, so two of them never interleave batches in the same case.

use crate::paths::TimelinePaths;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};

/// Held for the lifetime of one writing command. Released when dropped.
pub struct CaseLock {
    _file: File,
}

impl CaseLock {
    /// Claim the case for `operation` (e.g. "ingest") without blocking.
    /// When another writer holds it, the error names that writer's operation.
    pub fn acquire(paths: &TimelinePaths, operation: &str) -> anyhow::Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&paths.lock_file)
            .map_err(|e| {
                anyhow::anyhow!("cannot open lock file {}: {}", paths.lock_file.display(), e)
            })?;

        if file.try_lock_exclusive().is_err() {
            let holder = std::fs::read_to_string(&paths.lock_file).unwrap_or_default();
            let holder = holder.trim();
            anyhow::bail!(
                "events.db in {} is busy ({})",
                paths.root.display(),
                if holder.is_empty() { "another writer" } else { holder }
            );
        }

        // Best effort: the holder note only feeds the error above.
        let note = format!("{operation} (pid {})", std::process::id());
        if let Err(e) = file
            .set_len(0)
            .and_then(|()| file.seek(SeekFrom::Start(0)))
            .and_then(|_| file.write_all(note.as_bytes()))
        {
            tracing::debug!(error = %e, "could not record lock holder");
        }

        Ok(Self { _file: file })
    }
}

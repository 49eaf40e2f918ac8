use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Files produced while processing one fax.
///
/// Every tracked file is removed by [`WorkingFiles::discard`] unless it was
/// released with [`WorkingFiles::keep`] first. Removal errors are logged and
/// otherwise ignored so they never change the outcome of the job that owned
/// the files.
///
/// Dropping the set without discarding it (a cancelled job) still removes the
/// remaining files, synchronously.
#[derive(Debug, Default)]
pub struct WorkingFiles {
    paths: Vec<PathBuf>,
}

impl WorkingFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `path` for removal and hand it back.
    pub fn track(&mut self, path: PathBuf) -> PathBuf {
        self.paths.push(path.clone());
        path
    }

    /// Stop tracking `path`; it outlives the job.
    pub fn keep(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    /// Remove every file still tracked.
    pub async fn discard(mut self) {
        for path in std::mem::take(&mut self.paths) {
            log_removal(&path, tokio::fs::remove_file(&path).await);
        }
    }
}

impl Drop for WorkingFiles {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            log_removal(&path, std::fs::remove_file(&path));
        }
    }
}

fn log_removal(path: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed working file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove working file"),
    }
}

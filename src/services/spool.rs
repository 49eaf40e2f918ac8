use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Hands finished call files to Asterisk by renaming them into its outgoing spool.
///
/// A rename is atomic on one filesystem, so Asterisk never sees a half-written
/// file. Staging and spool directories must therefore share a filesystem.
pub struct SpoolDispatcher {
    spool_dir: PathBuf,
}

impl SpoolDispatcher {
    pub fn new(spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            spool_dir: spool_dir.into(),
        }
    }

    pub fn spool_dir(&self) -> &Path {
        &self.spool_dir
    }

    /// Move `call_file` into the spool, keeping its name. Returns the new path.
    pub async fn relocate(&self, call_file: &Path) -> Result<PathBuf, SpoolError> {
        let name = call_file
            .file_name()
            .ok_or_else(|| SpoolError::InvalidPath(call_file.to_path_buf()))?;
        let destination = self.spool_dir.join(name);

        tracing::info!(
            source = %call_file.display(),
            destination = %destination.display(),
            "Spooling call file"
        );

        match tokio::fs::rename(call_file, &destination).await {
            Ok(()) => Ok(destination),
            Err(e) if e.kind() == ErrorKind::NotFound && !call_file.exists() => {
                Err(SpoolError::SourceNotFound(call_file.to_path_buf()))
            }
            Err(e) => Err(SpoolError::Relocation {
                source_path: call_file.to_path_buf(),
                destination,
                source: e,
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SpoolError {
    #[error("Call file {0} does not exist")]
    SourceNotFound(PathBuf),

    #[error("Not a file path: {0}")]
    InvalidPath(PathBuf),

    #[error("Could not move {source_path} to {destination}: {source}")]
    Relocation {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

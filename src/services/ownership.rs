use std::path::{Path, PathBuf};

/// The uid/gid Asterisk runs as. Call files must belong to it before spooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub uid: u32,
    pub gid: u32,
}

impl Ownership {
    pub fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }

    pub async fn apply(&self, path: &Path) -> Result<(), OwnershipError> {
        tracing::debug!(
            path = %path.display(),
            uid = self.uid,
            gid = self.gid,
            "Setting call file owner"
        );

        let owned = path.to_path_buf();
        let (uid, gid) = (self.uid, self.gid);
        tokio::task::spawn_blocking(move || std::os::unix::fs::chown(&owned, Some(uid), Some(gid)))
            .await
            .map_err(|e| OwnershipError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::other(e),
            })?
            .map_err(|e| OwnershipError::Io {
                path: path.to_path_buf(),
                source: e,
            })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OwnershipError {
    #[error("Could not change owner of {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

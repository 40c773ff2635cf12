//! Error types for the synchronization engine.

use std::io;
use std::path::PathBuf;

/// Result type for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while synchronizing a bundle.
#[derive(Debug)]
pub enum SyncError {
    /// Requested bundle name is absent from the remote manifest collection.
    BundleNotFound { bundle: String },

    /// Failed to fetch the manifest collection.
    ManifestFetchFailed { url: String, reason: String },

    /// Failed to parse the manifest collection.
    ManifestParseFailed { url: String, reason: String },

    /// An object exhausted its download attempt budget.
    DownloadExhausted { key: String },

    /// An object transfer failed with a non-retryable error.
    TransferRejected { key: String, reason: String },

    /// Failed to read a file or directory.
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file.
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// Failed to delete a stray file.
    DeleteFailed { path: PathBuf, source: io::Error },
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BundleNotFound { bundle } => {
                write!(f, "bundle {} not found on the server", bundle)
            }
            Self::ManifestFetchFailed { url, reason } => {
                write!(f, "failed to fetch manifests from {}: {}", url, reason)
            }
            Self::ManifestParseFailed { url, reason } => {
                write!(f, "failed to parse manifests from {}: {}", url, reason)
            }
            Self::DownloadExhausted { key } => {
                write!(f, "download of {} failed after all attempts", key)
            }
            Self::TransferRejected { key, reason } => {
                write!(f, "download of {} rejected: {}", key, reason)
            }
            Self::ReadFailed { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            Self::WriteFailed { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
            Self::CreateDirFailed { path, source } => {
                write!(
                    f,
                    "failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::DeleteFailed { path, source } => {
                write!(f, "failed to delete {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFailed { source, .. } => Some(source),
            Self::WriteFailed { source, .. } => Some(source),
            Self::CreateDirFailed { source, .. } => Some(source),
            Self::DeleteFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_not_found_display() {
        let err = SyncError::BundleNotFound {
            bundle: "modpack-z".to_string(),
        };
        assert_eq!(err.to_string(), "bundle modpack-z not found on the server");
    }

    #[test]
    fn test_download_exhausted_display() {
        let err = SyncError::DownloadExhausted {
            key: "mods/foo.jar".to_string(),
        };
        assert!(err.to_string().contains("mods/foo.jar"));
        assert!(err.to_string().contains("all attempts"));
    }

    #[test]
    fn test_io_error_source() {
        let err = SyncError::ReadFailed {
            path: PathBuf::from("/tmp/x"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert!(std::error::Error::source(&err).is_some());
    }
}

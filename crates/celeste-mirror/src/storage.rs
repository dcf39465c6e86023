use std::sync::Arc;

use crate::category::FileCategory;
use crate::descriptor::FileDescriptor;

/// Largest number of file names sent in one delete request.
pub const DEFAULT_DELETE_BATCH_SIZE: usize = 100;

/// Failure of a single storage operation, always reducible to a status code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend returned HTTP {code}")]
    Status { code: u16 },

    #[error("network error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl StorageError {
    /// HTTP-style status describing the failure.
    pub fn status(&self) -> u16 {
        match self {
            Self::Status { code } => *code,
            Self::Transport(_) | Self::Decode(_) => 502,
            Self::Timeout => 504,
        }
    }

    /// Whether trying the same request again could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { code } => *code == 429 || *code >= 500,
            Self::Transport(_) | Self::Timeout => true,
            Self::Decode(_) => false,
        }
    }
}

/// The remote backend holding the mirrored files.
///
/// Implementations never panic on backend failures; every failure comes back
/// as a `StorageError` so the caller can carry on with other work.
#[async_trait::async_trait]
pub trait MirrorStorage: Send + Sync {
    /// Human-readable label identifying this backend.
    fn label(&self) -> &str;

    /// Largest delete batch the backend accepts.
    fn delete_batch_size(&self) -> usize {
        DEFAULT_DELETE_BATCH_SIZE
    }

    /// Names of the files currently stored for `category`.
    async fn list_files(&self, category: FileCategory) -> Result<Vec<String>, StorageError>;

    /// Delete one batch of files. Callers keep batches within `delete_batch_size`.
    async fn delete_files(
        &self,
        category: FileCategory,
        file_names: &[String],
    ) -> Result<(), StorageError>;

    /// Ask the backend to fetch `file.download_url` and store it as `file.file_name`.
    async fn request_download(
        &self,
        category: FileCategory,
        file: &FileDescriptor,
    ) -> Result<(), StorageError>;
}

#[async_trait::async_trait]
impl<T: MirrorStorage + ?Sized> MirrorStorage for Arc<T> {
    fn label(&self) -> &str {
        (**self).label()
    }

    fn delete_batch_size(&self) -> usize {
        (**self).delete_batch_size()
    }

    async fn list_files(&self, category: FileCategory) -> Result<Vec<String>, StorageError> {
        (**self).list_files(category).await
    }

    async fn delete_files(
        &self,
        category: FileCategory,
        file_names: &[String],
    ) -> Result<(), StorageError> {
        (**self).delete_files(category, file_names).await
    }

    async fn request_download(
        &self,
        category: FileCategory,
        file: &FileDescriptor,
    ) -> Result<(), StorageError> {
        (**self).request_download(category, file).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(StorageError::Status { code: 404 }.status(), 404);
        assert_eq!(StorageError::Transport("reset".into()).status(), 502);
        assert_eq!(StorageError::Decode("bad json".into()).status(), 502);
        assert_eq!(StorageError::Timeout.status(), 504);
    }

    #[test]
    fn retryable_failures() {
        assert!(StorageError::Timeout.is_retryable());
        assert!(StorageError::Transport("reset".into()).is_retryable());
        assert!(StorageError::Status { code: 503 }.is_retryable());
        assert!(StorageError::Status { code: 429 }.is_retryable());
        assert!(!StorageError::Status { code: 403 }.is_retryable());
        assert!(!StorageError::Decode("x".into()).is_retryable());
    }
}

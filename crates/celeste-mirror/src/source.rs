use std::sync::Arc;

use crate::manifest::ManifestKind;

/// Errors that can occur while downloading a manifest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("manifest download from {url} returned HTTP {status}")]
    Download { url: String, status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("manifest download timed out")]
    Timeout,
}

/// Where the authoritative manifests come from.
#[async_trait::async_trait]
pub trait ManifestSource: Send + Sync {
    /// Human-readable label identifying this source.
    fn label(&self) -> &str;

    /// Download the raw manifest text for `kind`.
    async fn fetch_manifest(&self, kind: ManifestKind) -> Result<String, FetchError>;
}

#[async_trait::async_trait]
impl<T: ManifestSource + ?Sized> ManifestSource for Arc<T> {
    fn label(&self) -> &str {
        (**self).label()
    }

    async fn fetch_manifest(&self, kind: ManifestKind) -> Result<String, FetchError> {
        (**self).fetch_manifest(kind).await
    }
}

use std::time::Duration;

use celeste_mirror::{FetchError, ManifestKind, ManifestSource};

/// Where each manifest kind is published.
#[derive(Debug, Clone)]
pub struct ManifestClientConfig {
    pub update_database_url: String,
    pub search_database_url: String,
    pub timeout: Duration,
}

/// Downloads manifests over plain HTTPS GET.
pub struct ManifestClient {
    config: ManifestClientConfig,
    client: reqwest::Client,
}

impl ManifestClient {
    pub fn new(config: ManifestClientConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, kind: ManifestKind) -> &str {
        match kind {
            ManifestKind::UpdateDatabase => &self.config.update_database_url,
            ManifestKind::SearchDatabase => &self.config.search_database_url,
        }
    }
}

#[async_trait::async_trait]
impl ManifestSource for ManifestClient {
    fn label(&self) -> &str {
        "http"
    }

    async fn fetch_manifest(&self, kind: ManifestKind) -> Result<String, FetchError> {
        let url = self.url(kind);
        tracing::debug!(kind = %kind, url, "downloading manifest");

        let response = self
            .client
            .get(url)
            .header("User-Agent", crate::USER_AGENT)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(fetch_error)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(kind = %kind, url, status = status.as_u16(), "manifest download failed");
            return Err(FetchError::Download {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(fetch_error)
    }
}

fn fetch_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(e.to_string())
    }
}

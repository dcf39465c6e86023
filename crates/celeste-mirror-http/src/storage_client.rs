use std::time::Duration;

use celeste_mirror::{FileCategory, FileDescriptor, MirrorStorage, StorageError};

use crate::wire::{DeleteRequest, FetchRequest, ListResponse};

/// Configuration for the HTTP storage backend.
#[derive(Debug, Clone)]
pub struct HttpMirrorStorageConfig {
    pub api_base_url: String,
    pub token: Option<String>,
    pub delete_batch_size: usize,
    pub timeout: Duration,
}

/// Mirror storage reached over the backend's JSON API.
///
/// Every call maps to exactly one request; failures come back as
/// `StorageError` values and are never retried here.
pub struct HttpMirrorStorage {
    config: HttpMirrorStorageConfig,
    client: reqwest::Client,
}

impl HttpMirrorStorage {
    pub fn new(config: HttpMirrorStorageConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn files_url(&self, category: FileCategory) -> String {
        format!(
            "{}/files/{}",
            self.config.api_base_url.trim_end_matches('/'),
            category.as_str(),
        )
    }

    fn build_request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .request(method, url)
            .header("User-Agent", crate::USER_AGENT)
            .timeout(self.config.timeout);

        if let Some(token) = &self.config.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        req
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, StorageError> {
        let response = req.send().await.map_err(storage_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Status {
                code: status.as_u16(),
            });
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl MirrorStorage for HttpMirrorStorage {
    fn label(&self) -> &str {
        &self.config.api_base_url
    }

    fn delete_batch_size(&self) -> usize {
        self.config.delete_batch_size
    }

    async fn list_files(&self, category: FileCategory) -> Result<Vec<String>, StorageError> {
        let url = self.files_url(category);
        let response = self.send(self.build_request(reqwest::Method::GET, &url)).await?;

        let body: ListResponse = response
            .json()
            .await
            .map_err(|e| StorageError::Decode(e.to_string()))?;

        Ok(body.files)
    }

    async fn delete_files(
        &self,
        category: FileCategory,
        file_names: &[String],
    ) -> Result<(), StorageError> {
        let url = format!("{}/delete", self.files_url(category));
        let req = self
            .build_request(reqwest::Method::POST, &url)
            .json(&DeleteRequest { file_names });

        self.send(req).await.map(drop)
    }

    async fn request_download(
        &self,
        category: FileCategory,
        file: &FileDescriptor,
    ) -> Result<(), StorageError> {
        let url = format!("{}/fetch", self.files_url(category));
        let req = self
            .build_request(reqwest::Method::POST, &url)
            .json(&FetchRequest {
                file_name: &file.file_name,
                url: &file.download_url,
            });

        self.send(req).await.map(drop)
    }
}

fn storage_error(e: reqwest::Error) -> StorageError {
    if e.is_timeout() {
        StorageError::Timeout
    } else {
        StorageError::Transport(e.to_string())
    }
}

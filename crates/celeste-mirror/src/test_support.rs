use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::{FetchError, FileCategory, FileDescriptor, ManifestKind, ManifestSource, MirrorStorage, StorageError};

/// Manifest source serving fixed text per kind. Kinds without text fail
/// with HTTP 404.
pub struct StaticManifestSource {
    manifests: Mutex<HashMap<ManifestKind, String>>,
}

impl StaticManifestSource {
    pub fn new() -> Self {
        Self {
            manifests: Mutex::new(HashMap::new()),
        }
    }

    pub fn with(kind: ManifestKind, text: impl Into<String>) -> Self {
        let source = Self::new();
        source.set(kind, text);
        source
    }

    pub fn set(&self, kind: ManifestKind, text: impl Into<String>) {
        self.manifests.lock().unwrap().insert(kind, text.into());
    }
}

impl Default for StaticManifestSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ManifestSource for StaticManifestSource {
    fn label(&self) -> &str {
        "static"
    }

    async fn fetch_manifest(&self, kind: ManifestKind) -> Result<String, FetchError> {
        self.manifests
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .ok_or_else(|| FetchError::Download {
                url: format!("static://{kind}"),
                status: 404,
            })
    }
}

/// A storage call observed by `InMemoryStorage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCall {
    List(FileCategory),
    Delete(FileCategory, Vec<String>),
    Download(FileCategory, FileDescriptor),
}

/// In-memory mirror. Downloads land immediately; failures can be injected
/// per category listing, per file name in a delete batch, or per download.
pub struct InMemoryStorage {
    files: Mutex<HashMap<FileCategory, Vec<String>>>,
    calls: Mutex<Vec<StorageCall>>,
    failing_lists: Mutex<HashSet<FileCategory>>,
    failing_names: Mutex<HashSet<String>>,
    batch_size: usize,
}

impl InMemoryStorage {
    pub fn new(batch_size: usize) -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            failing_lists: Mutex::new(HashSet::new()),
            failing_names: Mutex::new(HashSet::new()),
            batch_size,
        }
    }

    pub fn add(&self, category: FileCategory, file_name: impl Into<String>) {
        self.files
            .lock()
            .unwrap()
            .entry(category)
            .or_default()
            .push(file_name.into());
    }

    pub fn files(&self, category: FileCategory) -> Vec<String> {
        self.files
            .lock()
            .unwrap()
            .get(&category)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<StorageCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Make `list_files` for `category` fail with HTTP 503.
    pub fn fail_listing(&self, category: FileCategory) {
        self.failing_lists.lock().unwrap().insert(category);
    }

    /// Make any delete batch containing `file_name`, or any download of it,
    /// fail with HTTP 500.
    pub fn fail_file(&self, file_name: impl Into<String>) {
        self.failing_names.lock().unwrap().insert(file_name.into());
    }

    fn record(&self, call: StorageCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn is_failing(&self, file_name: &str) -> bool {
        self.failing_names.lock().unwrap().contains(file_name)
    }
}

#[async_trait::async_trait]
impl MirrorStorage for InMemoryStorage {
    fn label(&self) -> &str {
        "in-memory"
    }

    fn delete_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn list_files(&self, category: FileCategory) -> Result<Vec<String>, StorageError> {
        self.record(StorageCall::List(category));
        if self.failing_lists.lock().unwrap().contains(&category) {
            return Err(StorageError::Status { code: 503 });
        }
        Ok(self.files(category))
    }

    async fn delete_files(
        &self,
        category: FileCategory,
        file_names: &[String],
    ) -> Result<(), StorageError> {
        self.record(StorageCall::Delete(category, file_names.to_vec()));
        if file_names.iter().any(|n| self.is_failing(n)) {
            return Err(StorageError::Status { code: 500 });
        }
        if let Some(files) = self.files.lock().unwrap().get_mut(&category) {
            files.retain(|f| !file_names.contains(f));
        }
        Ok(())
    }

    async fn request_download(
        &self,
        category: FileCategory,
        file: &FileDescriptor,
    ) -> Result<(), StorageError> {
        self.record(StorageCall::Download(category, file.clone()));
        if self.is_failing(&file.file_name) {
            return Err(StorageError::Status { code: 500 });
        }
        self.add(category, file.file_name.clone());
        Ok(())
    }
}

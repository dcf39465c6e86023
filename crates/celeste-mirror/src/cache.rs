use std::path::{Path, PathBuf};

use crate::manifest::{Manifest, ManifestKind};

/// Errors raised by the on-disk manifest cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to read manifest cache {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to persist manifest cache {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode manifest: {0}")]
    Encode(String),

    #[error("cached manifest {path} is unusable: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// JSON copy of the last validated manifest of one kind.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// reader never sees a half-written cache.
#[derive(Debug, Clone)]
pub struct ManifestCache {
    path: PathBuf,
}

impl ManifestCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and revalidate the cached manifest. `Ok(None)` means no cache yet.
    pub async fn load(&self) -> Result<Option<Manifest>, CacheError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CacheError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let manifest: Manifest = serde_json::from_str(&text).map_err(|e| CacheError::Invalid {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        manifest.revalidate().map_err(|e| CacheError::Invalid {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        Ok(Some(manifest))
    }

    /// Overwrite the cache with `manifest`.
    pub async fn store(&self, manifest: &Manifest) -> Result<(), CacheError> {
        let json =
            serde_json::to_string_pretty(manifest).map_err(|e| CacheError::Encode(e.to_string()))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.write_error(source))?;
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|source| self.write_error(source))?;

        if let Err(source) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.write_error(source));
        }

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "manifest.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_error(&self, source: std::io::Error) -> CacheError {
        CacheError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

/// The cache file of each manifest kind.
#[derive(Debug, Clone)]
pub struct ManifestCaches {
    pub update_database: ManifestCache,
    pub search_database: ManifestCache,
}

impl ManifestCaches {
    pub fn get(&self, kind: ManifestKind) -> &ManifestCache {
        match kind {
            ManifestKind::UpdateDatabase => &self.update_database,
            ManifestKind::SearchDatabase => &self.search_database,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::FileDescriptor;

    use super::*;

    fn sample() -> Manifest {
        Manifest {
            mods: vec![FileDescriptor {
                file_name: "1.zip".into(),
                download_url: "https://host/mmdl/1".into(),
            }],
            screenshots: vec![],
            rich_presence_icons: vec![FileDescriptor {
                file_name: "icon.png".into(),
                download_url: "https://host/icon.png".into(),
            }],
        }
    }

    #[tokio::test]
    async fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ManifestCache::new(dir.path().join("absent.json"));
        assert!(cache.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ManifestCache::new(dir.path().join("nested/dir/update.json"));

        cache.store(&sample()).await.unwrap();
        let loaded = cache.load().await.unwrap();

        assert_eq!(loaded, Some(sample()));
        assert!(!dir.path().join("nested/dir/update.json.tmp").exists());
    }

    #[tokio::test]
    async fn store_overwrites_previous_copy() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ManifestCache::new(dir.path().join("update.json"));

        cache.store(&sample()).await.unwrap();
        cache.store(&Manifest::default()).await.unwrap();

        assert_eq!(cache.load().await.unwrap(), Some(Manifest::default()));
    }

    #[tokio::test]
    async fn corrupt_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("update.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = ManifestCache::new(&path).load().await;
        assert!(matches!(result, Err(CacheError::Invalid { .. })));
    }

    #[tokio::test]
    async fn tampered_entry_fails_revalidation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("update.json");
        std::fs::write(
            &path,
            r#"{"mods":[{"fileName":"x.zip","downloadUrl":"https://host/y.zip"}],"screenshots":[],"richPresenceIcons":[]}"#,
        )
        .unwrap();

        let result = ManifestCache::new(&path).load().await;
        assert!(matches!(result, Err(CacheError::Invalid { .. })));
    }

    #[tokio::test]
    async fn unwritable_location_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        let cache = ManifestCache::new(blocker.join("update.json"));
        let result = cache.store(&sample()).await;
        assert!(matches!(result, Err(CacheError::Write { .. })));
    }
}

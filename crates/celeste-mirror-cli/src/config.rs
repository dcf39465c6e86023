use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use celeste_mirror::ManifestKind;
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "celeste-mirror";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub manifest: ManifestSection,
    pub storage: StorageSection,
    pub sync: SyncSection,
    pub webhook: WebhookSection,
    pub logging: LoggingSection,
    pub history: HistorySection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ManifestSection {
    /// Publisher endpoint for each manifest kind. No defaults: the
    /// endpoint must serve the category-keyed manifest shape.
    pub update_database_url: Option<String>,
    pub search_database_url: Option<String>,
    pub update_database_cache: Option<PathBuf>,
    pub search_database_cache: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for ManifestSection {
    fn default() -> Self {
        Self {
            update_database_url: None,
            search_database_url: None,
            update_database_cache: None,
            search_database_cache: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageSection {
    pub api_base_url: Option<String>,
    pub token: Option<String>,
    pub delete_batch_size: usize,
    pub timeout_secs: u64,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            api_base_url: None,
            token: None,
            delete_batch_size: celeste_mirror::DEFAULT_DELETE_BATCH_SIZE,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncSection {
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub max_concurrent_requests: usize,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            retry_backoff_ms: 500,
            max_backoff_ms: 30_000,
            max_concurrent_requests: 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebhookSection {
    pub bind: String,
    pub secret: Option<String>,
    pub test_mode: bool,
    pub respond_async: bool,
}

impl Default for WebhookSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".into(),
            secret: None,
            test_mode: false,
            respond_async: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Nothing is logged unless this is set (or `--verbose` is passed).
    pub perform_logging: bool,
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            perform_logging: false,
            filter: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HistorySection {
    pub enabled: bool,
    pub path: Option<PathBuf>,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl AppConfig {
    /// Apply environment overrides. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup("CELESTE_MIRROR_SECRET") {
            self.webhook.secret = Some(secret);
        }
        if let Some(token) = lookup("CELESTE_MIRROR_STORAGE_TOKEN") {
            self.storage.token = Some(token);
        }
        if let Some(url) = lookup("CELESTE_MIRROR_STORAGE_URL") {
            self.storage.api_base_url = Some(url);
        }
        if let Some(url) = lookup("CELESTE_MIRROR_UPDATE_DATABASE_URL") {
            self.manifest.update_database_url = Some(url);
        }
        if let Some(url) = lookup("CELESTE_MIRROR_SEARCH_DATABASE_URL") {
            self.manifest.search_database_url = Some(url);
        }
        if let Some(path) = lookup("CELESTE_MIRROR_UPDATE_DATABASE_CACHE") {
            self.manifest.update_database_cache = Some(path.into());
        }
        if let Some(path) = lookup("CELESTE_MIRROR_SEARCH_DATABASE_CACHE") {
            self.manifest.search_database_cache = Some(path.into());
        }
    }

    /// Source URL for `kind`. Fails when it is not configured.
    pub fn manifest_url(&self, kind: ManifestKind) -> Result<String> {
        let (configured, key, var) = match kind {
            ManifestKind::UpdateDatabase => (
                &self.manifest.update_database_url,
                "manifest.update_database_url",
                "CELESTE_MIRROR_UPDATE_DATABASE_URL",
            ),
            ManifestKind::SearchDatabase => (
                &self.manifest.search_database_url,
                "manifest.search_database_url",
                "CELESTE_MIRROR_SEARCH_DATABASE_URL",
            ),
        };
        configured
            .clone()
            .with_context(|| format!("no {kind} manifest source configured; set {key} or {var}"))
    }

    /// Cache file for `kind`, defaulting to the user cache directory.
    pub fn cache_path(&self, kind: ManifestKind) -> Result<PathBuf> {
        let configured = match kind {
            ManifestKind::UpdateDatabase => &self.manifest.update_database_cache,
            ManifestKind::SearchDatabase => &self.manifest.search_database_cache,
        };
        match configured {
            Some(path) => Ok(path.clone()),
            None => Ok(cache_dir()?.join(format!("{}.json", kind.as_str()))),
        }
    }

    pub fn history_path(&self) -> Result<PathBuf> {
        match &self.history.path {
            Some(path) => Ok(path.clone()),
            None => Ok(cache_dir()?.join("history.db")),
        }
    }

    pub fn manifest_timeout(&self) -> Duration {
        Duration::from_secs(self.manifest.timeout_secs)
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage.timeout_secs)
    }
}

fn cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("could not determine cache directory")?;
    Ok(base.join(APP_DIR))
}

/// Config file path: `~/.config/celeste-mirror/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Load config from `explicit` or the default path, then apply environment
/// overrides. A missing default file means defaults; a missing explicit
/// file or an unparseable one is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let mut config = match explicit {
        Some(path) => read_config(path)?,
        None => match config_path() {
            Some(path) if path.exists() => read_config(&path)?,
            _ => AppConfig::default(),
        },
    };

    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

fn read_config(path: &Path) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("failed to parse config at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.storage.delete_batch_size, 100);
        assert_eq!(config.sync.max_attempts, 1);
        assert_eq!(config.sync.max_backoff_ms, 30_000);
        assert_eq!(config.webhook.bind, "127.0.0.1:8080");
        assert!(!config.logging.perform_logging);
        assert!(config.history.enabled);
        assert_eq!(config.manifest.update_database_url, None);
    }

    #[test]
    fn parse_sections_from_toml() {
        let toml_str = r#"
[manifest]
update_database_url = "https://example.com/update.yaml"
update_database_cache = "/var/cache/update.json"

[storage]
api_base_url = "https://storage.example.com/api"
delete_batch_size = 20

[sync]
max_attempts = 3
max_backoff_ms = 2000

[webhook]
bind = "0.0.0.0:9000"
test_mode = true

[logging]
perform_logging = true
filter = "celeste_mirror=debug"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.manifest_url(ManifestKind::UpdateDatabase).unwrap(),
            "https://example.com/update.yaml"
        );
        assert_eq!(config.manifest.search_database_url, None);
        assert_eq!(
            config.cache_path(ManifestKind::UpdateDatabase).unwrap(),
            PathBuf::from("/var/cache/update.json")
        );
        assert_eq!(
            config.storage.api_base_url.as_deref(),
            Some("https://storage.example.com/api")
        );
        assert_eq!(config.storage.delete_batch_size, 20);
        assert_eq!(config.storage.timeout_secs, 30);
        assert_eq!(config.sync.max_attempts, 3);
        assert_eq!(config.sync.max_backoff_ms, 2000);
        assert_eq!(config.sync.retry_backoff_ms, 500);
        assert_eq!(config.webhook.bind, "0.0.0.0:9000");
        assert!(config.webhook.test_mode);
        assert!(config.logging.perform_logging);
        assert_eq!(config.logging.filter, "celeste_mirror=debug");
    }

    #[test]
    fn manifest_url_must_be_configured() {
        let config = AppConfig::default();

        let err = config.manifest_url(ManifestKind::SearchDatabase).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("manifest.search_database_url"), "{message}");
        assert!(message.contains("CELESTE_MIRROR_SEARCH_DATABASE_URL"), "{message}");
        assert!(config.manifest_url(ManifestKind::UpdateDatabase).is_err());
    }

    #[test]
    fn manifest_urls_from_env() {
        let mut config = AppConfig::default();
        let env = HashMap::from([
            ("CELESTE_MIRROR_UPDATE_DATABASE_URL", "https://env.example.com/update.yaml"),
            ("CELESTE_MIRROR_SEARCH_DATABASE_URL", "https://env.example.com/search.yaml"),
        ]);
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(
            config.manifest_url(ManifestKind::UpdateDatabase).unwrap(),
            "https://env.example.com/update.yaml"
        );
        assert_eq!(
            config.manifest_url(ManifestKind::SearchDatabase).unwrap(),
            "https://env.example.com/search.yaml"
        );
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config: AppConfig = toml::from_str(
            r#"
[storage]
token = "from-file"
"#,
        )
        .unwrap();

        let env = HashMap::from([
            ("CELESTE_MIRROR_SECRET", "s3cret"),
            ("CELESTE_MIRROR_STORAGE_TOKEN", "from-env"),
            ("CELESTE_MIRROR_STORAGE_URL", "https://env.example.com"),
            ("CELESTE_MIRROR_SEARCH_DATABASE_CACHE", "/tmp/search.json"),
        ]);
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.webhook.secret.as_deref(), Some("s3cret"));
        assert_eq!(config.storage.token.as_deref(), Some("from-env"));
        assert_eq!(
            config.storage.api_base_url.as_deref(),
            Some("https://env.example.com")
        );
        assert_eq!(
            config.cache_path(ManifestKind::SearchDatabase).unwrap(),
            PathBuf::from("/tmp/search.json")
        );
        assert_eq!(config.manifest.update_database_cache, None);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(Some(&dir.path().join("absent.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn explicit_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[history]\nenabled = false\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert!(!config.history.enabled);
    }

    #[test]
    fn unparseable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[storage\n").unwrap();

        assert!(load_config(Some(&path)).is_err());
    }
}

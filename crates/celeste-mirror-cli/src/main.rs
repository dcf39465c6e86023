mod commands;
mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use celeste_mirror::{
    FileCategory, ManifestCache, ManifestCaches, ManifestKind, SyncEngine, SyncOptions,
};
use celeste_mirror_http::{
    HttpMirrorStorage, HttpMirrorStorageConfig, ManifestClient, ManifestClientConfig,
};
use celeste_mirror_store::{SyncHistory, SyncStatus};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::{AppConfig, LoggingSection};

#[derive(Parser)]
#[command(name = "celeste-mirror")]
#[command(about = "Keep the Celeste mod file mirror in sync with the published manifests")]
struct Cli {
    /// Config file (defaults to ~/.config/celeste-mirror/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log to stderr at debug level regardless of logging.perform_logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the update webhook server
    Serve {
        /// Address to listen on (overrides webhook.bind)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Run one synchronization pass now
    Sync {
        /// Use the mod search database instead of the update database
        #[arg(long)]
        search_database: bool,
        /// Print the plan without changing the mirror or the cache
        #[arg(long)]
        dry_run: bool,
    },
    /// Print a manifest, from the cache when possible
    Manifest {
        /// Use the mod search database instead of the update database
        #[arg(long)]
        search_database: bool,
        /// Only show one category (mods, screenshots, richPresenceIcons)
        #[arg(long)]
        category: Option<String>,
    },
    /// Show recent synchronization passes and mirror freshness
    History {
        /// Number of passes to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn init_logging(section: &LoggingSection, verbose: bool) -> Result<()> {
    if !section.perform_logging && !verbose {
        return Ok(());
    }

    let default_filter = if verbose { "debug" } else { section.filter.as_str() };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to install logger")
}

fn build_engine(config: &AppConfig) -> Result<SyncEngine> {
    let source = ManifestClient::new(ManifestClientConfig {
        update_database_url: config.manifest_url(ManifestKind::UpdateDatabase)?,
        search_database_url: config.manifest_url(ManifestKind::SearchDatabase)?,
        timeout: config.manifest_timeout(),
    });

    let api_base_url = config.storage.api_base_url.clone().context(
        "no storage backend configured; set storage.api_base_url or CELESTE_MIRROR_STORAGE_URL",
    )?;
    let storage = HttpMirrorStorage::new(HttpMirrorStorageConfig {
        api_base_url,
        token: config.storage.token.clone(),
        delete_batch_size: config.storage.delete_batch_size,
        timeout: config.storage_timeout(),
    });

    let caches = ManifestCaches {
        update_database: ManifestCache::new(config.cache_path(ManifestKind::UpdateDatabase)?),
        search_database: ManifestCache::new(config.cache_path(ManifestKind::SearchDatabase)?),
    };

    let options = SyncOptions {
        delete_batch_size: None,
        max_attempts: config.sync.max_attempts,
        retry_backoff: std::time::Duration::from_millis(config.sync.retry_backoff_ms),
        max_backoff: std::time::Duration::from_millis(config.sync.max_backoff_ms),
        max_concurrent_requests: config.sync.max_concurrent_requests,
    };

    Ok(SyncEngine::new(Arc::new(source), Arc::new(storage), caches, options))
}

/// Open the history database, or `None` when history is disabled.
fn open_history(config: &AppConfig) -> Result<Option<SyncHistory>> {
    if !config.history.enabled {
        return Ok(None);
    }
    let path = config.history_path()?;
    let history = SyncHistory::open(&path)
        .with_context(|| format!("failed to open history at {}", path.display()))?;
    Ok(Some(history))
}

/// Warn when the last successful pass is old.
fn warn_if_stale(history: &SyncHistory, kind: ManifestKind) {
    match history.sync_status(kind) {
        Ok(SyncStatus::Stale { hours_old }) => {
            eprintln!("warning: {kind} was last synchronized {hours_old}h ago");
        }
        Ok(_) => {}
        Err(e) => eprintln!("warning: could not check sync status for {kind}: {e}"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;
    init_logging(&config.logging, cli.verbose)?;

    match cli.command {
        Command::Serve { bind } => {
            let engine = build_engine(&config)?;
            let history = open_history(&config)?;
            commands::serve::run(engine, history, &config.webhook, bind).await
        }
        Command::Sync {
            search_database,
            dry_run,
        } => {
            let kind = ManifestKind::from_search_flag(search_database);
            let engine = build_engine(&config)?;
            let history = open_history(&config)?;
            if let Some(history) = &history {
                warn_if_stale(history, kind);
            }
            commands::sync::run(&engine, history.as_ref(), kind, dry_run).await
        }
        Command::Manifest {
            search_database,
            category,
        } => {
            let category = category
                .map(|c| {
                    FileCategory::parse(&c).with_context(|| format!("unknown category: {c}"))
                })
                .transpose()?;
            let engine = build_engine(&config)?;
            commands::manifest::run(&engine, ManifestKind::from_search_flag(search_database), category)
                .await
        }
        Command::History { limit } => {
            let history = open_history(&config)?.context("history is disabled in the config")?;
            commands::history::run(&history, limit)
        }
    }
}

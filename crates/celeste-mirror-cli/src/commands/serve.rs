use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use celeste_mirror::SyncEngine;
use celeste_mirror_store::SyncHistory;
use celeste_mirror_webhook::{WebhookConfig, WebhookState};

use crate::config::WebhookSection;

/// Serve the update webhook until the process is stopped.
pub async fn run(
    engine: SyncEngine,
    history: Option<SyncHistory>,
    section: &WebhookSection,
    bind: Option<SocketAddr>,
) -> Result<()> {
    let addr = match bind {
        Some(addr) => addr,
        None => section
            .bind
            .parse()
            .with_context(|| format!("invalid webhook bind address: {}", section.bind))?,
    };

    let secret = match (&section.secret, section.test_mode) {
        (Some(secret), _) if !secret.is_empty() => secret.clone(),
        (_, true) => String::new(),
        _ => anyhow::bail!(
            "no webhook secret configured; set webhook.secret or CELESTE_MIRROR_SECRET"
        ),
    };

    if section.test_mode {
        eprintln!("warning: webhook test mode is on; deliveries are not authenticated or applied");
    }

    let state = WebhookState {
        engine: Arc::new(engine),
        history: history.map(Arc::new),
        config: WebhookConfig {
            secret,
            test_mode: section.test_mode,
            respond_async: section.respond_async,
        },
    };

    println!("Listening for updates on http://{addr}/webhook/update");
    celeste_mirror_webhook::serve(addr, state)
        .await
        .with_context(|| format!("webhook server on {addr} failed"))
}

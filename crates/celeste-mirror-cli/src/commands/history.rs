use anyhow::Result;
use celeste_mirror::ManifestKind;
use celeste_mirror_store::{PassRecord, SyncHistory, SyncStatus};

/// Print freshness per manifest kind followed by the most recent passes.
pub fn run(history: &SyncHistory, limit: usize) -> Result<()> {
    for kind in ManifestKind::ALL {
        let status = history
            .sync_status(kind)
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        match status {
            SyncStatus::NeverSynced => println!("{kind}: never synchronized"),
            SyncStatus::Fresh { hours_old } => {
                println!("{kind}: last synchronized {hours_old}h ago")
            }
            SyncStatus::Stale { hours_old } => println!(
                "{kind}: stale, last synchronized {hours_old}h ago. Run `celeste-mirror sync` to refresh."
            ),
        }
    }

    let passes = history.recent(limit).map_err(|e| anyhow::anyhow!("{e}"))?;
    if passes.is_empty() {
        return Ok(());
    }

    println!();
    for pass in &passes {
        print_pass(pass);
    }

    Ok(())
}

fn print_pass(pass: &PassRecord) {
    let mode = if pass.dry_run { " (dry run)" } else { "" };
    println!(
        "#{} {} at {} -> {}{mode}",
        pass.id, pass.kind, pass.recorded_at, pass.status
    );

    if let Some(error) = &pass.manifest_error {
        println!("  manifest: {error}");
    }

    for category in &pass.categories {
        println!(
            "  {}: {} deleted, {} requested",
            category.category, category.deleted, category.requested
        );
        for failure in &category.failures {
            println!("    failed: {failure}");
        }
    }
}

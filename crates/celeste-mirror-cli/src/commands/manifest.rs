use anyhow::Result;
use celeste_mirror::{FileCategory, ManifestKind, ManifestOrigin, SyncEngine};

use crate::commands::format;

/// Print a manifest, preferring the cached copy.
pub async fn run(
    engine: &SyncEngine,
    kind: ManifestKind,
    category: Option<FileCategory>,
) -> Result<()> {
    let (manifest, origin) = engine
        .load_manifest(kind)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    match origin {
        ManifestOrigin::Cache => eprintln!(
            "Using cached {kind} manifest ({}).",
            engine.cache(kind).path().display()
        ),
        ManifestOrigin::Fresh => eprintln!("Downloaded a fresh {kind} manifest."),
    }

    format::print_manifest(&manifest, category);
    Ok(())
}

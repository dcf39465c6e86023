use anyhow::Result;
use celeste_mirror::{Feedback, ManifestKind, SyncEngine};
use celeste_mirror_store::SyncHistory;

use crate::commands::format;

/// Print feedback items: progress to stdout, warnings and errors to stderr.
pub fn print_feedback(feedback: &[Feedback]) {
    for item in feedback {
        if goes_to_stderr(item) {
            eprintln!("{item}");
        } else {
            println!("{item}");
        }
    }
}

fn goes_to_stderr(item: &Feedback) -> bool {
    item.is_error() || item.is_warning()
}

/// Run one pass and print its feedback. Fails when the pass did.
pub async fn run(
    engine: &SyncEngine,
    history: Option<&SyncHistory>,
    kind: ManifestKind,
    dry_run: bool,
) -> Result<()> {
    if dry_run {
        println!("Planning {kind} against {}...", engine.storage_label());
        let outcome = engine.dry_run(kind).await;

        print_feedback(&outcome.report.feedback);
        format::print_plans(&outcome.plans);

        if !outcome.report.is_success() {
            anyhow::bail!("{}", outcome.report.summary());
        }
        return Ok(());
    }

    println!("Synchronizing {kind} into {}...", engine.storage_label());
    let report = engine.run(kind).await;

    print_feedback(&report.feedback);

    if let Some(history) = history
        && let Err(e) = history.record(&report)
    {
        eprintln!("warning: failed to record pass: {e}");
    }

    if !report.is_success() {
        anyhow::bail!("{}", report.summary());
    }

    println!("{}", report.summary());
    Ok(())
}

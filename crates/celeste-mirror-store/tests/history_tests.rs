use celeste_mirror::{
    CacheError, CategoryReport, FileCategory, ManifestFailure, ManifestKind, Operation,
    OperationFailure, PlannedCounts, StorageError, SyncReport,
};
use celeste_mirror_store::{SyncHistory, SyncStatus};

const HOUR: u64 = 3600;
const NOW: u64 = 1_700_000_000;

fn create_history() -> SyncHistory {
    SyncHistory::open_in_memory().unwrap()
}

fn category(category: FileCategory, deleted: usize, requested: usize) -> CategoryReport {
    CategoryReport {
        planned: Some(PlannedCounts {
            to_delete: deleted,
            to_download: requested,
        }),
        deleted,
        requested,
        ..CategoryReport::new(category)
    }
}

fn successful_report(kind: ManifestKind) -> SyncReport {
    let mut report = SyncReport::new(kind, false);
    report.categories = vec![
        category(FileCategory::Mods, 2, 3),
        category(FileCategory::Screenshots, 0, 1),
        category(FileCategory::RichPresenceIcons, 0, 0),
    ];
    report
}

fn failed_report(kind: ManifestKind) -> SyncReport {
    let mut report = successful_report(kind);
    report.categories[1].failures.push(OperationFailure {
        operation: Operation::RequestDownload {
            file_name: "s.png".into(),
            url: "https://host/s.png".into(),
        },
        error: StorageError::Status { code: 502 },
    });
    report
}

#[test]
fn empty_history() {
    let history = create_history();
    assert!(history.last_pass(ManifestKind::UpdateDatabase).unwrap().is_none());
    assert!(history.recent(10).unwrap().is_empty());
    assert_eq!(
        history.sync_status(ManifestKind::UpdateDatabase).unwrap(),
        SyncStatus::NeverSynced
    );
}

#[test]
fn record_then_read_back() {
    let history = create_history();
    history
        .record_at(&failed_report(ManifestKind::UpdateDatabase), NOW)
        .unwrap();

    let pass = history.last_pass(ManifestKind::UpdateDatabase).unwrap().unwrap();
    assert_eq!(pass.kind, ManifestKind::UpdateDatabase);
    assert_eq!(pass.recorded_at, NOW);
    assert_eq!(pass.status, 500);
    assert!(!pass.is_success());
    assert_eq!(pass.categories.len(), 3);

    let mods = &pass.categories[0];
    assert_eq!(mods.category, FileCategory::Mods);
    assert_eq!(mods.to_delete, Some(2));
    assert_eq!(mods.requested, 3);
    assert!(mods.failures.is_empty());

    let screenshots = &pass.categories[1];
    assert_eq!(screenshots.failures, vec!["download s.png -> 502"]);
}

#[test]
fn listing_failure_has_no_plan() {
    let history = create_history();
    let mut report = SyncReport::new(ManifestKind::SearchDatabase, false);
    let mut mods = CategoryReport::new(FileCategory::Mods);
    mods.failures.push(OperationFailure {
        operation: Operation::List,
        error: StorageError::Timeout,
    });
    report.categories.push(mods);

    history.record_at(&report, NOW).unwrap();

    let pass = history.last_pass(ManifestKind::SearchDatabase).unwrap().unwrap();
    assert_eq!(pass.categories[0].to_delete, None);
    assert_eq!(pass.categories[0].failures, vec!["list -> 504"]);
}

#[test]
fn manifest_error_is_stored() {
    let history = create_history();
    let mut report = successful_report(ManifestKind::UpdateDatabase);
    report.manifest_failure = Some(ManifestFailure::Persist(CacheError::Encode("boom".into())));

    history.record_at(&report, NOW).unwrap();

    let pass = history.last_pass(ManifestKind::UpdateDatabase).unwrap().unwrap();
    assert_eq!(pass.status, 500);
    assert!(pass.manifest_error.unwrap().contains("boom"));
}

#[test]
fn last_pass_is_per_kind_and_skips_dry_runs() {
    let history = create_history();
    history
        .record_at(&successful_report(ManifestKind::UpdateDatabase), NOW - HOUR)
        .unwrap();
    history
        .record_at(&failed_report(ManifestKind::SearchDatabase), NOW)
        .unwrap();
    history
        .record_at(&SyncReport::new(ManifestKind::UpdateDatabase, true), NOW)
        .unwrap();

    let update = history.last_pass(ManifestKind::UpdateDatabase).unwrap().unwrap();
    assert_eq!(update.recorded_at, NOW - HOUR);
    assert!(!update.dry_run);

    let search = history.last_pass(ManifestKind::SearchDatabase).unwrap().unwrap();
    assert_eq!(search.status, 500);
}

#[test]
fn recent_is_newest_first_and_limited() {
    let history = create_history();
    for i in 0..5 {
        history
            .record_at(&successful_report(ManifestKind::UpdateDatabase), NOW + i)
            .unwrap();
    }

    let recent = history.recent(3).unwrap();
    let times: Vec<u64> = recent.iter().map(|p| p.recorded_at).collect();
    assert_eq!(times, vec![NOW + 4, NOW + 3, NOW + 2]);
}

#[test]
fn sync_status_fresh_then_stale() {
    let history = create_history();
    history
        .record_at(&successful_report(ManifestKind::UpdateDatabase), NOW)
        .unwrap();

    assert_eq!(
        history
            .sync_status_at(ManifestKind::UpdateDatabase, NOW + 3 * HOUR)
            .unwrap(),
        SyncStatus::Fresh { hours_old: 3 }
    );
    assert_eq!(
        history
            .sync_status_at(ManifestKind::UpdateDatabase, NOW + 30 * HOUR)
            .unwrap(),
        SyncStatus::Stale { hours_old: 30 }
    );
    assert_eq!(
        history.sync_status_at(ManifestKind::SearchDatabase, NOW).unwrap(),
        SyncStatus::NeverSynced
    );
}

#[test]
fn failed_passes_do_not_count_as_synced() {
    let history = create_history();
    history
        .record_at(&successful_report(ManifestKind::UpdateDatabase), NOW)
        .unwrap();
    history
        .record_at(&failed_report(ManifestKind::UpdateDatabase), NOW + 10 * HOUR)
        .unwrap();

    assert_eq!(
        history
            .sync_status_at(ManifestKind::UpdateDatabase, NOW + 10 * HOUR)
            .unwrap(),
        SyncStatus::Fresh { hours_old: 10 }
    );
}

#[test]
fn file_backed_history_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/history.db");

    {
        let history = SyncHistory::open(&path).unwrap();
        history
            .record_at(&successful_report(ManifestKind::SearchDatabase), NOW)
            .unwrap();
    }

    let history = SyncHistory::open(&path).unwrap();
    let pass = history.last_pass(ManifestKind::SearchDatabase).unwrap().unwrap();
    assert_eq!(pass.recorded_at, NOW);
    assert!(pass.is_success());
}

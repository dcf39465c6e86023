use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use celeste_mirror::{FileCategory, ManifestKind, SyncReport};

use crate::schema;

/// How recently a manifest kind was last synchronized successfully.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncStatus {
    NeverSynced,
    Stale { hours_old: u64 },
    Fresh { hours_old: u64 },
}

/// Threshold in hours before a mirror is considered stale.
const STALE_THRESHOLD_HOURS: u64 = 24;

/// One recorded synchronization pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassRecord {
    pub id: i64,
    pub kind: ManifestKind,
    /// Seconds since the Unix epoch.
    pub recorded_at: u64,
    pub dry_run: bool,
    pub status: u16,
    pub manifest_error: Option<String>,
    pub categories: Vec<CategoryRecord>,
}

impl PassRecord {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Per-category outcome stored with a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRecord {
    pub category: FileCategory,
    /// `None` when the listing failed before a plan was made.
    pub to_delete: Option<u64>,
    pub to_download: Option<u64>,
    pub deleted: u64,
    pub requested: u64,
    /// One line per failed operation, `"<operation> -> <status>"`.
    pub failures: Vec<String>,
}

/// Errors specific to history operations.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("database error: {0}")]
    Database(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("history connection lock poisoned")]
    Poisoned,
}

impl From<rusqlite::Error> for HistoryError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// A SQLite log of synchronization passes.
pub struct SyncHistory {
    conn: Mutex<rusqlite::Connection>,
}

impl SyncHistory {
    /// Open a history backed by a file on disk.
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| HistoryError::Database(e.to_string()))?;
        }
        Self::from_connection(rusqlite::Connection::open(path)?)
    }

    /// Open an in-memory history (for testing).
    pub fn open_in_memory() -> Result<Self, HistoryError> {
        Self::from_connection(rusqlite::Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: rusqlite::Connection) -> Result<Self, HistoryError> {
        schema::migrations()
            .to_latest(&mut conn)
            .map_err(|e| HistoryError::Migration(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, rusqlite::Connection>, HistoryError> {
        self.conn.lock().map_err(|_| HistoryError::Poisoned)
    }

    /// Record a finished pass, stamped with the current time.
    pub fn record(&self, report: &SyncReport) -> Result<i64, HistoryError> {
        self.record_at(report, now_epoch_secs())
    }

    /// Record a finished pass with an explicit timestamp.
    pub fn record_at(&self, report: &SyncReport, epoch_secs: u64) -> Result<i64, HistoryError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let manifest_error = report.manifest_failure.as_ref().map(|f| f.to_string());
        tx.execute(
            "INSERT INTO passes (kind, recorded_at, dry_run, status, manifest_error)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                report.kind.as_str(),
                to_sql_int(epoch_secs),
                report.dry_run,
                report.status_code(),
                manifest_error,
            ],
        )?;
        let pass_id = tx.last_insert_rowid();

        for category in &report.categories {
            let failures: Vec<String> = category
                .failures
                .iter()
                .map(|f| format!("{} -> {}", f.operation, f.status()))
                .collect();
            let failures_json = serde_json::to_string(&failures)
                .map_err(|e| HistoryError::Database(e.to_string()))?;

            tx.execute(
                "INSERT INTO category_results
                    (pass_id, category, to_delete, to_download, deleted, requested, failures_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    pass_id,
                    category.category.as_str(),
                    category.planned.map(|p| to_sql_int(p.to_delete as u64)),
                    category.planned.map(|p| to_sql_int(p.to_download as u64)),
                    to_sql_int(category.deleted as u64),
                    to_sql_int(category.requested as u64),
                    failures_json,
                ],
            )?;
        }

        tx.commit()?;
        tracing::debug!(pass_id, kind = %report.kind, "recorded synchronization pass");
        Ok(pass_id)
    }

    /// Most recent applied (non dry-run) pass for `kind`.
    pub fn last_pass(&self, kind: ManifestKind) -> Result<Option<PassRecord>, HistoryError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, kind, recorded_at, dry_run, status, manifest_error
             FROM passes
             WHERE kind = ?1 AND dry_run = 0
             ORDER BY recorded_at DESC, id DESC
             LIMIT 1",
        )?;

        let pass = stmt
            .query_map([kind.as_str()], row_to_pass)?
            .filter_map(|r| r.ok())
            .flatten()
            .next();

        match pass {
            Some(mut pass) => {
                pass.categories = load_categories(&conn, pass.id)?;
                Ok(Some(pass))
            }
            None => Ok(None),
        }
    }

    /// The `limit` most recent passes of any kind, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<PassRecord>, HistoryError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, kind, recorded_at, dry_run, status, manifest_error
             FROM passes
             ORDER BY recorded_at DESC, id DESC
             LIMIT ?1",
        )?;

        let mut passes: Vec<PassRecord> = stmt
            .query_map([to_sql_int(limit as u64)], row_to_pass)?
            .filter_map(|r| r.ok())
            .flatten()
            .collect();

        for pass in &mut passes {
            pass.categories = load_categories(&conn, pass.id)?;
        }

        Ok(passes)
    }

    /// Freshness of the last successful applied pass for `kind`.
    pub fn sync_status(&self, kind: ManifestKind) -> Result<SyncStatus, HistoryError> {
        self.sync_status_at(kind, now_epoch_secs())
    }

    /// Freshness as seen at `now` (seconds since the Unix epoch).
    pub fn sync_status_at(&self, kind: ManifestKind, now: u64) -> Result<SyncStatus, HistoryError> {
        let conn = self.conn()?;

        let last: Option<i64> = conn.query_row(
            "SELECT MAX(recorded_at) FROM passes
             WHERE kind = ?1 AND dry_run = 0 AND status = 200",
            [kind.as_str()],
            |row| row.get(0),
        )?;

        Ok(match last {
            None => SyncStatus::NeverSynced,
            Some(then) => {
                let hours_old = now.saturating_sub(then.max(0) as u64) / 3600;
                if hours_old >= STALE_THRESHOLD_HOURS {
                    SyncStatus::Stale { hours_old }
                } else {
                    SyncStatus::Fresh { hours_old }
                }
            }
        })
    }
}

/// Rows whose kind no longer parses are skipped rather than failing the query.
fn row_to_pass(row: &rusqlite::Row) -> rusqlite::Result<Option<PassRecord>> {
    let id: i64 = row.get(0)?;
    let kind_str: String = row.get(1)?;
    let recorded_at: i64 = row.get(2)?;
    let dry_run: bool = row.get(3)?;
    let status: u16 = row.get(4)?;
    let manifest_error: Option<String> = row.get(5)?;

    Ok(ManifestKind::parse(&kind_str).map(|kind| PassRecord {
        id,
        kind,
        recorded_at: recorded_at.max(0) as u64,
        dry_run,
        status,
        manifest_error,
        categories: Vec::new(),
    }))
}

fn load_categories(
    conn: &rusqlite::Connection,
    pass_id: i64,
) -> Result<Vec<CategoryRecord>, HistoryError> {
    let mut stmt = conn.prepare(
        "SELECT category, to_delete, to_download, deleted, requested, failures_json
         FROM category_results
         WHERE pass_id = ?1
         ORDER BY rowid",
    )?;

    let records = stmt
        .query_map([pass_id], |row| {
            let category: String = row.get(0)?;
            let to_delete: Option<i64> = row.get(1)?;
            let to_download: Option<i64> = row.get(2)?;
            let deleted: i64 = row.get(3)?;
            let requested: i64 = row.get(4)?;
            let failures_json: String = row.get(5)?;

            Ok(FileCategory::parse(&category).map(|category| CategoryRecord {
                category,
                to_delete: to_delete.map(from_sql_int),
                to_download: to_download.map(from_sql_int),
                deleted: from_sql_int(deleted),
                requested: from_sql_int(requested),
                failures: serde_json::from_str(&failures_json).unwrap_or_default(),
            }))
        })?
        .filter_map(|r| r.ok())
        .flatten()
        .collect();

    Ok(records)
}

fn to_sql_int(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn from_sql_int(n: i64) -> u64 {
    n.max(0) as u64
}

fn now_epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

use std::fmt;

use crate::cache::CacheError;
use crate::category::FileCategory;
use crate::feedback::Feedback;
use crate::manifest::{ManifestError, ManifestKind, ValidationError};
use crate::source::FetchError;
use crate::storage::StorageError;

/// Why the manifest stage of a pass did not complete cleanly.
#[derive(Debug, thiserror::Error)]
pub enum ManifestFailure {
    #[error("failed to fetch manifest: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ManifestError),

    #[error("manifest failed validation: {0}")]
    Validation(#[from] ValidationError),

    /// The manifest was valid but could not be written to disk. The pass
    /// still ran against the in-memory copy.
    #[error(transparent)]
    Persist(#[from] CacheError),
}

impl ManifestFailure {
    /// True when the pass stopped before touching the mirror.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Persist(_))
    }
}

/// Which storage call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    List,
    DeleteBatch { index: usize, file_names: Vec<String> },
    RequestDownload { file_name: String, url: String },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::DeleteBatch { index, file_names } => {
                write!(f, "delete batch #{index} ({} files)", file_names.len())
            }
            Self::RequestDownload { file_name, .. } => write!(f, "download {file_name}"),
        }
    }
}

/// A storage call that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    pub operation: Operation,
    pub error: StorageError,
}

impl OperationFailure {
    pub fn status(&self) -> u16 {
        self.error.status()
    }
}

/// Outcome of one category's list → diff → apply pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryReport {
    pub category: FileCategory,
    /// Plan sizes; `None` when the listing failed and no plan was made.
    pub planned: Option<PlannedCounts>,
    pub deleted: usize,
    pub requested: usize,
    pub failures: Vec<OperationFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedCounts {
    pub to_delete: usize,
    pub to_download: usize,
}

impl CategoryReport {
    pub fn new(category: FileCategory) -> Self {
        Self {
            category,
            planned: None,
            deleted: 0,
            requested: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Everything that happened during one synchronization pass.
#[derive(Debug)]
pub struct SyncReport {
    pub kind: ManifestKind,
    pub dry_run: bool,
    pub manifest_failure: Option<ManifestFailure>,
    pub categories: Vec<CategoryReport>,
    pub feedback: Vec<Feedback>,
}

impl SyncReport {
    pub fn new(kind: ManifestKind, dry_run: bool) -> Self {
        Self {
            kind,
            dry_run,
            manifest_failure: None,
            categories: Vec::new(),
            feedback: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.manifest_failure.is_none() && self.categories.iter().all(CategoryReport::is_success)
    }

    /// 200 when the manifest stage and every category succeeded, else 500.
    pub fn status_code(&self) -> u16 {
        if self.is_success() { 200 } else { 500 }
    }

    pub fn failed_categories(&self) -> Vec<FileCategory> {
        self.categories
            .iter()
            .filter(|c| !c.is_success())
            .map(|c| c.category)
            .collect()
    }

    /// Short operator-facing summary without internal paths.
    pub fn summary(&self) -> String {
        if self.is_success() {
            let deleted: usize = self.categories.iter().map(|c| c.deleted).sum();
            let requested: usize = self.categories.iter().map(|c| c.requested).sum();
            return format!(
                "{} synchronized: {deleted} deleted, {requested} download(s) requested",
                self.kind
            );
        }

        let mut parts = Vec::new();
        if let Some(failure) = &self.manifest_failure {
            parts.push(match failure {
                ManifestFailure::Fetch(_) => "manifest fetch failed".to_owned(),
                ManifestFailure::Parse(_) => "manifest could not be parsed".to_owned(),
                ManifestFailure::Validation(_) => "manifest failed validation".to_owned(),
                ManifestFailure::Persist(_) => "manifest could not be persisted".to_owned(),
            });
            if failure.is_terminal() {
                parts.push("mirror left unchanged".to_owned());
            }
        }
        for category in self.failed_categories() {
            parts.push(format!("{category} failed"));
        }
        format!("{} synchronization failed: {}", self.kind, parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_category(category: FileCategory) -> CategoryReport {
        CategoryReport {
            deleted: 1,
            requested: 2,
            ..CategoryReport::new(category)
        }
    }

    #[test]
    fn empty_report_is_success() {
        let report = SyncReport::new(ManifestKind::UpdateDatabase, false);
        assert!(report.is_success());
        assert_eq!(report.status_code(), 200);
    }

    #[test]
    fn any_category_failure_is_500() {
        let mut failed = CategoryReport::new(FileCategory::Screenshots);
        failed.failures.push(OperationFailure {
            operation: Operation::List,
            error: StorageError::Status { code: 503 },
        });

        let mut report = SyncReport::new(ManifestKind::UpdateDatabase, false);
        report.categories = vec![ok_category(FileCategory::Mods), failed];

        assert_eq!(report.status_code(), 500);
        assert_eq!(report.failed_categories(), vec![FileCategory::Screenshots]);
        assert_eq!(
            report.summary(),
            "update-database synchronization failed: screenshots failed"
        );
    }

    #[test]
    fn persist_failure_is_not_terminal_but_fails_the_pass() {
        let failure = ManifestFailure::Persist(CacheError::Encode("boom".into()));
        assert!(!failure.is_terminal());

        let mut report = SyncReport::new(ManifestKind::SearchDatabase, false);
        report.manifest_failure = Some(failure);
        report.categories = vec![ok_category(FileCategory::Mods)];
        assert_eq!(report.status_code(), 500);
        assert!(report.summary().contains("could not be persisted"));
        assert!(!report.summary().contains("mirror left unchanged"));
    }

    #[test]
    fn terminal_failure_summary_says_mirror_unchanged() {
        let mut report = SyncReport::new(ManifestKind::UpdateDatabase, false);
        report.manifest_failure = Some(ManifestFailure::Fetch(FetchError::Timeout));

        assert_eq!(
            report.summary(),
            "update-database synchronization failed: manifest fetch failed, mirror left unchanged"
        );
    }

    #[test]
    fn success_summary_counts_work() {
        let mut report = SyncReport::new(ManifestKind::UpdateDatabase, false);
        report.categories = vec![
            ok_category(FileCategory::Mods),
            ok_category(FileCategory::Screenshots),
        ];
        assert_eq!(
            report.summary(),
            "update-database synchronized: 2 deleted, 4 download(s) requested"
        );
    }

    #[test]
    fn operation_display() {
        let op = Operation::DeleteBatch {
            index: 1,
            file_names: vec!["a".into(), "b".into()],
        };
        assert_eq!(op.to_string(), "delete batch #1 (2 files)");
    }
}

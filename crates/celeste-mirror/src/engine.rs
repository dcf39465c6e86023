use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use futures::future::join_all;
use futures::stream;

use crate::cache::{ManifestCache, ManifestCaches};
use crate::category::FileCategory;
use crate::descriptor::FileDescriptor;
use crate::diff::SyncPlan;
use crate::feedback::Feedback;
use crate::manifest::{Manifest, ManifestKind, parse_manifest, validate_manifest};
use crate::report::{
    CategoryReport, ManifestFailure, Operation, OperationFailure, PlannedCounts, SyncReport,
};
use crate::source::ManifestSource;
use crate::storage::{MirrorStorage, StorageError};
use crate::update::{AnnouncedUpdate, unlisted_files};

/// Tuning knobs for a synchronization pass.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Overrides the storage backend's own delete batch size.
    pub delete_batch_size: Option<usize>,
    /// Attempts per storage call. 1 means no retry.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each further attempt.
    pub retry_backoff: Duration,
    /// Upper bound on a single retry delay.
    pub max_backoff: Duration,
    /// Storage requests in flight at once within one category.
    pub max_concurrent_requests: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            delete_batch_size: None,
            max_attempts: 1,
            retry_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            max_concurrent_requests: 16,
        }
    }
}

impl SyncOptions {
    /// Delay before retry number `retry` (1-based): `retry_backoff`
    /// doubled per earlier retry, clamped to `max_backoff`.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.retry_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Where a manifest handed out by `load_manifest` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestOrigin {
    Cache,
    Fresh,
}

/// Result of a pass, with the per-category plans that were computed.
#[derive(Debug)]
pub struct PassOutcome {
    pub report: SyncReport,
    pub plans: Vec<SyncPlan>,
}

/// Keeps the storage mirror in line with the publisher's manifests.
///
/// Passes that modify the mirror are serialized: a second trigger waits for
/// the running pass to finish instead of interleaving with it.
pub struct SyncEngine {
    source: Arc<dyn ManifestSource>,
    storage: Arc<dyn MirrorStorage>,
    caches: ManifestCaches,
    options: SyncOptions,
    pass_lock: tokio::sync::Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn ManifestSource>,
        storage: Arc<dyn MirrorStorage>,
        caches: ManifestCaches,
        options: SyncOptions,
    ) -> Self {
        Self {
            source,
            storage,
            caches,
            options,
            pass_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn cache(&self, kind: ManifestKind) -> &ManifestCache {
        self.caches.get(kind)
    }

    pub fn storage_label(&self) -> &str {
        self.storage.label()
    }

    /// Download, parse and validate a manifest without persisting it.
    pub async fn fetch_validated(&self, kind: ManifestKind) -> Result<Manifest, ManifestFailure> {
        let text = self.source.fetch_manifest(kind).await.inspect_err(|e| {
            tracing::error!(kind = %kind, source = self.source.label(), error = %e, "manifest fetch failed");
        })?;

        let value = parse_manifest(&text).inspect_err(|e| {
            tracing::error!(kind = %kind, error = %e, "manifest parse failed");
        })?;

        let manifest = validate_manifest(&value).inspect_err(|e| {
            tracing::error!(kind = %kind, error = %e, "manifest validation failed");
        })?;

        tracing::debug!(kind = %kind, files = manifest.total_files(), "manifest validated");
        Ok(manifest)
    }

    /// Read a manifest for display or lookup: the cached copy when it is
    /// present and still valid, otherwise a fresh download that then
    /// refreshes the cache.
    pub async fn load_manifest(
        &self,
        kind: ManifestKind,
    ) -> Result<(Manifest, ManifestOrigin), ManifestFailure> {
        let cache = self.cache(kind);

        match cache.load().await {
            Ok(Some(manifest)) => return Ok((manifest, ManifestOrigin::Cache)),
            Ok(None) => {
                tracing::debug!(kind = %kind, path = %cache.path().display(), "no cached manifest");
            }
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "ignoring unusable manifest cache");
            }
        }

        let manifest = self.fetch_validated(kind).await?;
        if let Err(e) = cache.store(&manifest).await {
            tracing::warn!(kind = %kind, error = %e, "fetched manifest could not be cached");
        }
        Ok((manifest, ManifestOrigin::Fresh))
    }

    /// Run a full pass for `kind` and apply the resulting plans.
    pub async fn run(&self, kind: ManifestKind) -> SyncReport {
        self.pass(kind, None, true).await.report
    }

    /// Run a full pass triggered by an update notification. Announced files
    /// that the fresh manifest does not list are reported as warnings.
    pub async fn run_announced(&self, update: &AnnouncedUpdate) -> SyncReport {
        self.pass(update.kind, Some(&update.files), true).await.report
    }

    /// Compute the plans a pass would apply, without touching the mirror or
    /// the cache.
    pub async fn dry_run(&self, kind: ManifestKind) -> PassOutcome {
        self.pass(kind, None, false).await
    }

    async fn pass(&self, kind: ManifestKind, announced: Option<&Manifest>, apply: bool) -> PassOutcome {
        let _guard = if apply {
            Some(self.pass_lock.lock().await)
        } else {
            None
        };

        tracing::info!(kind = %kind, apply, "starting synchronization pass");
        let mut report = SyncReport::new(kind, !apply);

        let manifest = match self.fetch_validated(kind).await {
            Ok(manifest) => manifest,
            Err(failure) => {
                report.feedback.push(Feedback::error(failure.to_string()));
                report.manifest_failure = Some(failure);
                return PassOutcome {
                    report,
                    plans: Vec::new(),
                };
            }
        };

        if apply
            && let Err(e) = self.cache(kind).store(&manifest).await
        {
            // The in-memory manifest is still valid; keep going.
            tracing::error!(kind = %kind, error = %e, "failed to persist manifest cache");
            report.feedback.push(Feedback::error(e.to_string()));
            report.manifest_failure = Some(ManifestFailure::Persist(e));
        }

        if let Some(announced) = announced {
            for (category, file_name) in unlisted_files(announced, &manifest) {
                report.feedback.push(Feedback::warning(format!(
                    "announced {category} file {file_name} is not in the {kind} manifest"
                )));
            }
        }

        let results = join_all(
            FileCategory::ALL
                .iter()
                .map(|&category| self.sync_category(category, manifest.files(category), apply)),
        )
        .await;

        let mut plans = Vec::new();
        for (category_report, plan) in results {
            report.feedback.push(category_feedback(&category_report));
            report.categories.push(category_report);
            plans.extend(plan);
        }

        if report.is_success() {
            tracing::info!(kind = %kind, "synchronization pass succeeded");
        } else {
            tracing::warn!(
                kind = %kind,
                failed = ?report.failed_categories(),
                "synchronization pass finished with failures"
            );
        }

        PassOutcome { report, plans }
    }

    /// List → diff → apply for one category. Failures stay inside the
    /// returned report.
    async fn sync_category(
        &self,
        category: FileCategory,
        desired: &[FileDescriptor],
        apply: bool,
    ) -> (CategoryReport, Option<SyncPlan>) {
        let mut report = CategoryReport::new(category);

        let existing = match self.attempt(|| self.storage.list_files(category)).await {
            Ok(existing) => existing,
            Err(error) => {
                tracing::error!(
                    category = %category,
                    operation = "list",
                    status = error.status(),
                    error = %error,
                    "failed to list mirror files"
                );
                report.failures.push(OperationFailure {
                    operation: Operation::List,
                    error,
                });
                return (report, None);
            }
        };

        let plan = SyncPlan::new(category, desired, &existing);
        report.planned = Some(PlannedCounts {
            to_delete: plan.to_delete.len(),
            to_download: plan.to_download.len(),
        });

        tracing::debug!(
            category = %category,
            existing = existing.len(),
            to_delete = plan.to_delete.len(),
            to_download = plan.to_download.len(),
            "computed sync plan"
        );

        if !apply || plan.is_empty() {
            return (report, Some(plan));
        }

        let batch_size = self
            .options
            .delete_batch_size
            .unwrap_or_else(|| self.storage.delete_batch_size());
        let concurrency = self.options.max_concurrent_requests.max(1);

        let deletes = stream::iter(plan.delete_batches(batch_size).into_iter().enumerate())
            .map(|(index, batch)| async move {
                let result = self.attempt(|| self.storage.delete_files(category, batch)).await;
                (index, batch, result)
            })
            .buffer_unordered(concurrency)
            .collect::<Vec<_>>()
            .boxed();

        let downloads = stream::iter(plan.to_download.iter())
            .map(|file| async move {
                let result = self
                    .attempt(|| self.storage.request_download(category, file))
                    .await;
                (file, result)
            })
            .buffer_unordered(concurrency)
            .collect::<Vec<_>>()
            .boxed();

        let (delete_results, download_results) = futures::join!(deletes, downloads);

        for (index, batch, result) in delete_results {
            match result {
                Ok(()) => report.deleted += batch.len(),
                Err(error) => {
                    tracing::error!(
                        category = %category,
                        operation = "delete",
                        batch = index,
                        files = batch.len(),
                        status = error.status(),
                        error = %error,
                        "delete batch failed"
                    );
                    report.failures.push(OperationFailure {
                        operation: Operation::DeleteBatch {
                            index,
                            file_names: batch.to_vec(),
                        },
                        error,
                    });
                }
            }
        }

        for (file, result) in download_results {
            match result {
                Ok(()) => report.requested += 1,
                Err(error) => {
                    tracing::error!(
                        category = %category,
                        operation = "download",
                        file = %file.file_name,
                        url = %file.download_url,
                        status = error.status(),
                        error = %error,
                        "download request failed"
                    );
                    report.failures.push(OperationFailure {
                        operation: Operation::RequestDownload {
                            file_name: file.file_name.clone(),
                            url: file.download_url.clone(),
                        },
                        error,
                    });
                }
            }
        }

        (report, Some(plan))
    }

    /// Run a storage call, retrying retryable failures with exponential
    /// backoff up to `max_attempts` times.
    async fn attempt<T, F, Fut>(&self, mut call: F) -> Result<T, StorageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let max_attempts = self.options.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && e.is_retryable() => {
                    let delay = self.options.backoff_delay(attempt);
                    tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying storage call");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn category_feedback(report: &CategoryReport) -> Feedback {
    let category = report.category;
    match (&report.planned, report.failures.is_empty()) {
        (None, _) => Feedback::error(format!("{category}: could not list mirror files")),
        (Some(planned), true) => Feedback::info(format!(
            "{category}: {} to delete, {} to download ({} deleted, {} requested)",
            planned.to_delete, planned.to_download, report.deleted, report.requested
        )),
        (Some(_), false) => Feedback::error(format!(
            "{category}: {} operation(s) failed ({})",
            report.failures.len(),
            report
                .failures
                .iter()
                .map(|f| format!("{} -> {}", f.operation, f.status()))
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}

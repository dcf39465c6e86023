pub mod cache;
pub mod category;
pub mod descriptor;
pub mod diff;
pub mod engine;
pub mod feedback;
pub mod manifest;
pub mod report;
pub mod source;
pub mod storage;
pub mod update;

pub use cache::{CacheError, ManifestCache, ManifestCaches};
pub use category::FileCategory;
pub use descriptor::{FileDescriptor, InvalidUrlError, resolve_file_name};
pub use diff::{SyncPlan, diff};
pub use engine::{ManifestOrigin, PassOutcome, SyncEngine, SyncOptions};
pub use feedback::Feedback;
pub use manifest::{
    Manifest, ManifestError, ManifestKind, ValidationError, parse_manifest, validate,
    validate_manifest,
};
pub use report::{
    CategoryReport, ManifestFailure, Operation, OperationFailure, PlannedCounts, SyncReport,
};
pub use source::{FetchError, ManifestSource};
pub use storage::{DEFAULT_DELETE_BATCH_SIZE, MirrorStorage, StorageError};
pub use update::{AnnouncedUpdate, Update, UpdateError};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

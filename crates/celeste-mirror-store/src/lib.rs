mod schema;
pub mod store;

pub use store::{CategoryRecord, HistoryError, PassRecord, SyncHistory, SyncStatus};

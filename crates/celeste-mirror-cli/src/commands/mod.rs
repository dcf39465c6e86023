pub mod format;
pub mod history;
pub mod manifest;
pub mod serve;
pub mod sync;

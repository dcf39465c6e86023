use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::category::FileCategory;
use crate::descriptor::FileDescriptor;

/// What has to change in one category for the mirror to match the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPlan {
    pub category: FileCategory,
    pub to_delete: Vec<String>,
    pub to_download: Vec<FileDescriptor>,
}

impl SyncPlan {
    pub fn new(category: FileCategory, desired: &[FileDescriptor], existing: &[String]) -> Self {
        let (to_delete, to_download) = diff(desired, existing);
        Self {
            category,
            to_delete,
            to_download,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_download.is_empty()
    }

    /// Split the deletions into batches of at most `batch_size` names.
    pub fn delete_batches(&self, batch_size: usize) -> Vec<&[String]> {
        self.to_delete.chunks(batch_size.max(1)).collect()
    }
}

/// Compare the files a category should hold with the files it does hold.
///
/// Every existing name either satisfies the first still-pending desired file
/// with the same name, or is scheduled for deletion. A matching name counts
/// as the same content; nothing is hashed. If `desired` repeats a name, each
/// existing copy consumes only one of the repeats.
pub fn diff(desired: &[FileDescriptor], existing: &[String]) -> (Vec<String>, Vec<FileDescriptor>) {
    let mut pending: HashMap<&str, VecDeque<usize>> = HashMap::new();
    for (idx, file) in desired.iter().enumerate() {
        pending.entry(file.file_name.as_str()).or_default().push_back(idx);
    }

    let mut satisfied = vec![false; desired.len()];
    let mut to_delete = Vec::new();

    for name in existing {
        match pending.get_mut(name.as_str()).and_then(|queue| queue.pop_front()) {
            Some(idx) => satisfied[idx] = true,
            None => to_delete.push(name.clone()),
        }
    }

    let to_download = desired
        .iter()
        .zip(&satisfied)
        .filter(|(_, done)| !**done)
        .map(|(file, _)| file.clone())
        .collect();

    (to_delete, to_download)
}

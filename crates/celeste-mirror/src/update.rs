use serde::Deserialize;

use crate::category::FileCategory;
use crate::descriptor::{FileDescriptor, InvalidUrlError};
use crate::manifest::{Manifest, ManifestKind};

/// Body of an update notification from the manifest publisher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    #[serde(default)]
    pub is_mod_search_database_update: bool,
    pub mods: Vec<String>,
    pub screenshots: Vec<String>,
    pub rich_presence_icons: Vec<String>,
}

/// An update whose URLs all resolved to mirror file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncedUpdate {
    pub kind: ManifestKind,
    pub files: Manifest,
}

/// Why an update body was refused.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("malformed update body: {0}")]
    Malformed(String),

    #[error("invalid {category} URL: {source}")]
    InvalidUrl {
        category: FileCategory,
        #[source]
        source: InvalidUrlError,
    },
}

impl Update {
    /// Decode a webhook body. The body is a JSON string whose contents are
    /// the JSON-encoded `Update`.
    pub fn decode(body: &str) -> Result<Self, UpdateError> {
        let inner: String = serde_json::from_str(body)
            .map_err(|e| UpdateError::Malformed(format!("body is not a JSON string: {e}")))?;

        serde_json::from_str(&inner).map_err(|e| UpdateError::Malformed(e.to_string()))
    }

    pub fn urls(&self, category: FileCategory) -> &[String] {
        match category {
            FileCategory::Mods => &self.mods,
            FileCategory::Screenshots => &self.screenshots,
            FileCategory::RichPresenceIcons => &self.rich_presence_icons,
        }
    }

    /// Resolve every announced URL, failing on the first one that cannot be
    /// turned into a file name.
    pub fn resolve(&self) -> Result<AnnouncedUpdate, UpdateError> {
        let resolve_all = |category: FileCategory| -> Result<Vec<FileDescriptor>, UpdateError> {
            self.urls(category)
                .iter()
                .map(|url| {
                    FileDescriptor::resolve(url, category)
                        .map_err(|source| UpdateError::InvalidUrl { category, source })
                })
                .collect()
        };

        Ok(AnnouncedUpdate {
            kind: ManifestKind::from_search_flag(self.is_mod_search_database_update),
            files: Manifest {
                mods: resolve_all(FileCategory::Mods)?,
                screenshots: resolve_all(FileCategory::Screenshots)?,
                rich_presence_icons: resolve_all(FileCategory::RichPresenceIcons)?,
            },
        })
    }
}

/// Announced files the manifest does not list, as `(category, file name)`.
pub fn unlisted_files<'a>(announced: &'a Manifest, manifest: &Manifest) -> Vec<(FileCategory, &'a str)> {
    FileCategory::ALL
        .iter()
        .flat_map(|&category| {
            let listed = manifest.files(category);
            announced
                .files(category)
                .iter()
                .filter(move |file| !listed.iter().any(|l| l.file_name == file.file_name))
                .map(move |file| (category, file.file_name.as_str()))
        })
        .collect()
}

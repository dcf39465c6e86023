use std::fmt;

use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;

use crate::category::FileCategory;
use crate::descriptor::{FileDescriptor, InvalidUrlError, is_absolute_url};

/// Field holding the download URL inside each manifest entry.
pub const URL_FIELD: &str = "URL";

/// The two manifests the publisher maintains. Each is fetched from its own
/// endpoint and cached in its own file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestKind {
    UpdateDatabase,
    SearchDatabase,
}

impl ManifestKind {
    pub const ALL: [ManifestKind; 2] = [Self::UpdateDatabase, Self::SearchDatabase];

    pub fn from_search_flag(is_mod_search_database_update: bool) -> Self {
        if is_mod_search_database_update {
            Self::SearchDatabase
        } else {
            Self::UpdateDatabase
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UpdateDatabase => "update-database",
            Self::SearchDatabase => "search-database",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "update-database" => Some(Self::UpdateDatabase),
            "search-database" => Some(Self::SearchDatabase),
            _ => None,
        }
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated manifest, trimmed to the fields the mirror consumes.
///
/// This is also the on-disk cache format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub mods: Vec<FileDescriptor>,
    pub screenshots: Vec<FileDescriptor>,
    pub rich_presence_icons: Vec<FileDescriptor>,
}

impl Manifest {
    pub fn files(&self, category: FileCategory) -> &[FileDescriptor] {
        match category {
            FileCategory::Mods => &self.mods,
            FileCategory::Screenshots => &self.screenshots,
            FileCategory::RichPresenceIcons => &self.rich_presence_icons,
        }
    }

    fn files_mut(&mut self, category: FileCategory) -> &mut Vec<FileDescriptor> {
        match category {
            FileCategory::Mods => &mut self.mods,
            FileCategory::Screenshots => &mut self.screenshots,
            FileCategory::RichPresenceIcons => &mut self.rich_presence_icons,
        }
    }

    pub fn total_files(&self) -> usize {
        FileCategory::ALL.iter().map(|c| self.files(*c).len()).sum()
    }

    /// Re-check a manifest that did not come straight from `validate_manifest`,
    /// e.g. one read back from the cache file.
    pub fn revalidate(&self) -> Result<(), ValidationError> {
        for category in FileCategory::ALL {
            for (index, file) in self.files(category).iter().enumerate() {
                check_url(&file.download_url, category, index)?;
                let resolved = FileDescriptor::resolve(&file.download_url, category)
                    .map_err(|source| ValidationError::InvalidUrl {
                        category,
                        index,
                        source,
                    })?;
                if resolved.file_name != file.file_name {
                    return Err(ValidationError::FileNameMismatch {
                        category,
                        index,
                        expected: resolved.file_name,
                        found: file.file_name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Errors raised while turning manifest text into a tree.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest is not valid YAML/JSON: {0}")]
    Parse(String),
}

/// The first structural problem found in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("manifest root is not a mapping")]
    NotAMapping,

    #[error("manifest has no {0} section")]
    MissingCategory(FileCategory),

    #[error("{0} section is not a list")]
    NotASequence(FileCategory),

    #[error("{category} entry #{index} is not a mapping")]
    EntryNotAMapping { category: FileCategory, index: usize },

    #[error("{category} entry #{index} has no URL field")]
    MissingUrl { category: FileCategory, index: usize },

    #[error("{category} entry #{index} has a non-string URL field")]
    UrlNotAString { category: FileCategory, index: usize },

    #[error("{category} entry #{index} has an empty URL")]
    EmptyUrl { category: FileCategory, index: usize },

    #[error("{category} entry #{index} has a relative URL: {url:?}")]
    RelativeUrl {
        category: FileCategory,
        index: usize,
        url: String,
    },

    #[error("{category} entry #{index}: {source}")]
    InvalidUrl {
        category: FileCategory,
        index: usize,
        #[source]
        source: InvalidUrlError,
    },

    #[error("{category} entry #{index} is named {found:?} but its URL resolves to {expected:?}")]
    FileNameMismatch {
        category: FileCategory,
        index: usize,
        expected: String,
        found: String,
    },
}

/// Parse manifest text. YAML is a superset of JSON, so both are accepted.
pub fn parse_manifest(text: &str) -> Result<Value, ManifestError> {
    serde_yaml_ng::from_str(text).map_err(|e| ManifestError::Parse(e.to_string()))
}

/// Validate one category of a parsed manifest.
///
/// Conservative: the first malformed entry rejects the whole category.
pub fn validate(value: &Value, category: FileCategory) -> Result<Vec<FileDescriptor>, ValidationError> {
    let root = value.as_mapping().ok_or(ValidationError::NotAMapping)?;

    let section = root
        .get(category.as_str())
        .ok_or(ValidationError::MissingCategory(category))?;

    // An empty YAML key (`mods:`) parses as null; treat it as an empty list.
    if section.is_null() {
        return Ok(Vec::new());
    }

    let entries = section
        .as_sequence()
        .ok_or(ValidationError::NotASequence(category))?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let entry = entry
                .as_mapping()
                .ok_or(ValidationError::EntryNotAMapping { category, index })?;

            let url = entry
                .get(URL_FIELD)
                .ok_or(ValidationError::MissingUrl { category, index })?
                .as_str()
                .ok_or(ValidationError::UrlNotAString { category, index })?;

            check_url(url, category, index)?;

            FileDescriptor::resolve(url, category).map_err(|source| ValidationError::InvalidUrl {
                category,
                index,
                source,
            })
        })
        .collect()
}

/// Validate every category and assemble a `Manifest`.
pub fn validate_manifest(value: &Value) -> Result<Manifest, ValidationError> {
    let mut manifest = Manifest::default();
    for category in FileCategory::ALL {
        *manifest.files_mut(category) = validate(value, category)?;
    }
    Ok(manifest)
}

fn check_url(url: &str, category: FileCategory, index: usize) -> Result<(), ValidationError> {
    if url.is_empty() {
        return Err(ValidationError::EmptyUrl { category, index });
    }
    if !is_absolute_url(url) {
        return Err(ValidationError::RelativeUrl {
            category,
            index,
            url: url.to_owned(),
        });
    }
    Ok(())
}

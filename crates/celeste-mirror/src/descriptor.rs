use serde::{Deserialize, Serialize};

use crate::category::FileCategory;

/// A file the mirror should hold: its derived name and where to get it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub file_name: String,
    pub download_url: String,
}

impl FileDescriptor {
    /// Resolve the file name for `download_url` and pair the two.
    pub fn resolve(download_url: &str, category: FileCategory) -> Result<Self, InvalidUrlError> {
        let file_name = resolve_file_name(download_url, category)?;
        Ok(Self {
            file_name,
            download_url: download_url.to_owned(),
        })
    }
}

/// Reasons a download URL cannot be turned into a mirror file name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidUrlError {
    #[error("download URL {url:?} has an empty file name")]
    EmptyFileName { url: String },

    #[error(
        "download URL {url:?} has extension {found:?} but {category} files must be .{expected}"
    )]
    ExtensionMismatch {
        url: String,
        category: FileCategory,
        expected: &'static str,
        found: String,
    },
}

/// Derive the mirror file name for a download URL.
///
/// The name is the text after the final `/`. A name with an extension must
/// carry the category's canonical one; a bare name gets it appended.
pub fn resolve_file_name(download_url: &str, category: FileCategory) -> Result<String, InvalidUrlError> {
    let tail = match download_url.rfind('/') {
        Some(idx) => &download_url[idx + 1..],
        None => download_url,
    };

    if tail.is_empty() {
        return Err(InvalidUrlError::EmptyFileName {
            url: download_url.to_owned(),
        });
    }

    let expected = category.extension();

    match tail.rfind('.') {
        Some(idx) => {
            let found = &tail[idx + 1..];
            if found != expected {
                return Err(InvalidUrlError::ExtensionMismatch {
                    url: download_url.to_owned(),
                    category,
                    expected,
                    found: found.to_owned(),
                });
            }
            Ok(tail.to_owned())
        }
        None => Ok(format!("{tail}.{expected}")),
    }
}

/// True for `scheme://rest` with a well-formed scheme and a non-empty rest.
pub fn is_absolute_url(url: &str) -> bool {
    let Some((scheme, rest)) = url.split_once("://") else {
        return false;
    };

    let mut chars = scheme.chars();
    let starts_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());

    starts_alpha
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !rest.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_matching_extension() {
        let name = resolve_file_name("https://host/path/a.zip", FileCategory::Mods).unwrap();
        assert_eq!(name, "a.zip");
    }

    #[test]
    fn infers_missing_extension() {
        let name = resolve_file_name("https://host/path/42", FileCategory::Mods).unwrap();
        assert_eq!(name, "42.zip");

        let icon = resolve_file_name("https://host/icons/abc", FileCategory::RichPresenceIcons)
            .unwrap();
        assert_eq!(icon, "abc.png");
    }

    #[test]
    fn rejects_empty_tail() {
        let err = resolve_file_name("https://host/path/", FileCategory::Mods).unwrap_err();
        assert!(matches!(err, InvalidUrlError::EmptyFileName { .. }));
    }

    #[test]
    fn rejects_empty_url() {
        let err = resolve_file_name("", FileCategory::Screenshots).unwrap_err();
        assert!(matches!(err, InvalidUrlError::EmptyFileName { .. }));
    }

    #[test]
    fn rejects_mismatched_extension() {
        let err = resolve_file_name("https://host/img/shot.jpg", FileCategory::Mods).unwrap_err();
        match err {
            InvalidUrlError::ExtensionMismatch {
                category,
                expected,
                found,
                ..
            } => {
                assert_eq!(category, FileCategory::Mods);
                assert_eq!(expected, "zip");
                assert_eq!(found, "jpg");
            }
            other => panic!("expected ExtensionMismatch, got {other:?}"),
        }
    }

    #[test]
    fn extension_comparison_is_exact() {
        let err = resolve_file_name("https://host/A.ZIP", FileCategory::Mods).unwrap_err();
        assert!(matches!(err, InvalidUrlError::ExtensionMismatch { .. }));
    }

    #[test]
    fn trailing_dot_is_an_empty_extension() {
        let err = resolve_file_name("https://host/file.", FileCategory::Mods).unwrap_err();
        assert!(matches!(
            err,
            InvalidUrlError::ExtensionMismatch { ref found, .. } if found.is_empty()
        ));
    }

    #[test]
    fn only_last_dot_counts() {
        let name = resolve_file_name("https://host/my.mod.v2.zip", FileCategory::Mods).unwrap();
        assert_eq!(name, "my.mod.v2.zip");
    }

    #[test]
    fn descriptor_resolve_keeps_url() {
        let desc = FileDescriptor::resolve("https://host/mmdl/1234", FileCategory::Mods).unwrap();
        assert_eq!(desc.file_name, "1234.zip");
        assert_eq!(desc.download_url, "https://host/mmdl/1234");
    }

    #[test]
    fn absolute_url_detection() {
        assert!(is_absolute_url("https://host/a.zip"));
        assert!(is_absolute_url("http://h"));
        assert!(!is_absolute_url("host/a.zip"));
        assert!(!is_absolute_url("/a.zip"));
        assert!(!is_absolute_url("https://"));
        assert!(!is_absolute_url("://host/a.zip"));
        assert!(!is_absolute_url("1http://host"));
    }

    #[test]
    fn descriptor_serializes_camel_case() {
        let desc = FileDescriptor {
            file_name: "a.zip".into(),
            download_url: "https://host/a.zip".into(),
        };
        let json = serde_json::to_string(&desc).unwrap();
        assert_eq!(json, r#"{"fileName":"a.zip","downloadUrl":"https://host/a.zip"}"#);
    }
}

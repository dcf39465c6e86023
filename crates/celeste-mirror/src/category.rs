use std::fmt;

use serde::{Deserialize, Serialize};

/// Partition of the mirrored file namespace.
///
/// Every category owns exactly one canonical file extension. The set is
/// closed: adding a category means adding a variant here and handling it
/// everywhere the compiler asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileCategory {
    Mods,
    Screenshots,
    RichPresenceIcons,
}

impl FileCategory {
    /// All categories in processing order.
    pub const ALL: [FileCategory; 3] = [Self::Mods, Self::Screenshots, Self::RichPresenceIcons];

    /// Canonical extension (without the leading dot).
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mods => "zip",
            Self::Screenshots => "png",
            Self::RichPresenceIcons => "png",
        }
    }

    /// Key used in manifests, update bodies and storage API paths.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mods => "mods",
            Self::Screenshots => "screenshots",
            Self::RichPresenceIcons => "richPresenceIcons",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mods" => Some(Self::Mods),
            "screenshots" => Some(Self::Screenshots),
            "richPresenceIcons" | "rich-presence-icons" => Some(Self::RichPresenceIcons),
            _ => None,
        }
    }

    /// Human-readable plural label for display.
    pub fn display_label(self) -> &'static str {
        match self {
            Self::Mods => "Mods",
            Self::Screenshots => "Screenshots",
            Self::RichPresenceIcons => "Rich Presence Icons",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! The closed set of tool categories.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Top-level grouping of tools used for bulk activation.
///
/// Declaration order is the display order used by category listings.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Always-on capability exploration and activation tools.
    Discovery,
    /// Session basics needed by every workflow.
    CoreOperations,
    /// Composition creation and rendering.
    VideoCreation,
    /// Lifecycle of external render-studio processes.
    StudioManagement,
    /// Text-to-speech and voice tooling backed by an external provider.
    VoiceGeneration,
    /// Image, audio, and subtitle asset production.
    AssetGeneration,
    /// Cleanup, validation, and code maintenance.
    Maintenance,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 7] = [
        Category::Discovery,
        Category::CoreOperations,
        Category::VideoCreation,
        Category::StudioManagement,
        Category::VoiceGeneration,
        Category::AssetGeneration,
        Category::Maintenance,
    ];

    /// Returns the stable kebab-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::CoreOperations => "core-operations",
            Self::VideoCreation => "video-creation",
            Self::StudioManagement => "studio-management",
            Self::VoiceGeneration => "voice-generation",
            Self::AssetGeneration => "asset-generation",
            Self::Maintenance => "maintenance",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| Error::UnknownCategory { id: s.to_owned() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_round_trip() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn serde_matches_identifier() {
        let json = serde_json::to_string(&Category::VoiceGeneration).unwrap();
        assert_eq!(json, "\"voice-generation\"");
    }

    #[test]
    fn unknown_identifier_errors() {
        let err = "teleportation".parse::<Category>().expect_err("unknown");
        assert!(matches!(err, Error::UnknownCategory { id } if id == "teleportation"));
    }
}

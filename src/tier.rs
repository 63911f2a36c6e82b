//! Compression tiers and the policy each one implies

use crate::document::CleanupOptions;
use crate::error::CompactError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named compression aggressiveness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionTier {
    /// Structural cleanup only, images untouched
    #[serde(rename = "less", alias = "light")]
    Light,
    /// Moderate image downsampling plus cleanup
    #[default]
    Recommended,
    /// Aggressive downsampling, maximum cleanup
    Extreme,
}

/// How images are re-encoded under a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePolicy {
    /// JPEG quality factor (1-100)
    pub quality: u8,
    /// Images wider than this are downscaled to exactly this width
    pub max_width: u32,
}

impl CompressionTier {
    pub const ALL: [CompressionTier; 3] = [
        CompressionTier::Light,
        CompressionTier::Recommended,
        CompressionTier::Extreme,
    ];

    /// Image policy, or `None` when the tier leaves images alone
    pub fn image_policy(self) -> Option<ImagePolicy> {
        match self {
            CompressionTier::Light => None,
            CompressionTier::Recommended => Some(ImagePolicy {
                quality: 60,
                max_width: 1600,
            }),
            CompressionTier::Extreme => Some(ImagePolicy {
                quality: 30,
                max_width: 800,
            }),
        }
    }

    /// Structural cleanup applied before serialization
    pub fn cleanup(self) -> CleanupOptions {
        match self {
            CompressionTier::Light => CleanupOptions {
                garbage: 3,
                deflate: true,
                clean: false,
            },
            CompressionTier::Recommended => CleanupOptions {
                garbage: 4,
                deflate: true,
                clean: false,
            },
            CompressionTier::Extreme => CleanupOptions {
                garbage: 4,
                deflate: true,
                clean: true,
            },
        }
    }

    /// The level name used at the form boundary
    pub fn as_str(self) -> &'static str {
        match self {
            CompressionTier::Light => "less",
            CompressionTier::Recommended => "recommended",
            CompressionTier::Extreme => "extreme",
        }
    }
}

impl fmt::Display for CompressionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionTier {
    type Err = CompactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "less" | "light" => Ok(CompressionTier::Light),
            "recommended" => Ok(CompressionTier::Recommended),
            "extreme" => Ok(CompressionTier::Extreme),
            other => Err(CompactError::InvalidLevel(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_table() {
        assert_eq!(CompressionTier::Light.image_policy(), None);

        let recommended = CompressionTier::Recommended.image_policy().unwrap();
        assert_eq!((recommended.quality, recommended.max_width), (60, 1600));

        let extreme = CompressionTier::Extreme.image_policy().unwrap();
        assert_eq!((extreme.quality, extreme.max_width), (30, 800));
    }

    #[test]
    fn cleanup_grows_with_tier() {
        let light = CompressionTier::Light.cleanup();
        assert_eq!(light.garbage, 3);
        assert!(light.deflate && !light.clean);

        assert_eq!(CompressionTier::Recommended.cleanup().garbage, 4);
        assert!(CompressionTier::Extreme.cleanup().clean);
    }

    #[test]
    fn parses_form_levels() {
        assert_eq!("less".parse::<CompressionTier>().unwrap(), CompressionTier::Light);
        assert_eq!(" Extreme ".parse::<CompressionTier>().unwrap(), CompressionTier::Extreme);
        assert!(matches!(
            "maximum".parse::<CompressionTier>(),
            Err(CompactError::InvalidLevel(_))
        ));
    }

    #[test]
    fn level_names_round_trip() {
        for tier in CompressionTier::ALL {
            assert_eq!(tier.as_str().parse::<CompressionTier>().unwrap(), tier);
        }
    }
}

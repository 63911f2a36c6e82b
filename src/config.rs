//! Settings passed explicitly to every file operation

use crate::error::{CompactError, Result};
use crate::rewrite::RewriteOptions;
use crate::tier::CompressionTier;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub compression: Compression,
}

/// Where uploads are stored and results are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub upload_dir: PathBuf,
    pub download_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            download_dir: PathBuf::from("downloads"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Compression {
    /// Level used when the caller does not name one
    pub default_level: CompressionTier,
    /// Transcode worker threads
    pub workers: usize,
}

impl Default for Compression {
    fn default() -> Self {
        Self {
            default_level: CompressionTier::Recommended,
            workers: 1,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
            .map_err(|e| CompactError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Create the upload and download directories if missing
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.paths.upload_dir)?;
        std::fs::create_dir_all(&self.paths.download_dir)?;
        Ok(())
    }

    pub fn rewrite_options(&self) -> RewriteOptions {
        RewriteOptions {
            workers: self.compression.workers.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.paths.download_dir, PathBuf::from("downloads"));
        assert_eq!(
            settings.compression.default_level,
            CompressionTier::Recommended
        );
        assert_eq!(settings.rewrite_options().workers, 1);
    }

    #[test]
    fn parses_sections() {
        let settings = Settings::from_toml(
            r#"
            [paths]
            upload_dir = "/tmp/in"
            download_dir = "/tmp/out"

            [compression]
            default_level = "less"
            workers = 4
            "#,
        )
        .unwrap();
        assert_eq!(settings.paths.upload_dir, PathBuf::from("/tmp/in"));
        assert_eq!(settings.compression.default_level, CompressionTier::Light);
        assert_eq!(settings.rewrite_options().workers, 4);
    }

    #[test]
    fn zero_workers_means_one() {
        let settings =
            Settings::from_toml("[compression]\ndefault_level = \"extreme\"\nworkers = 0").unwrap();
        assert_eq!(settings.rewrite_options().workers, 1);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let settings = Settings::from_toml("[compression]\nworkers = 3").unwrap();
        assert_eq!(settings.compression.workers, 3);
        assert_eq!(
            settings.compression.default_level,
            CompressionTier::Recommended
        );
    }

    #[test]
    fn unknown_level_is_rejected() {
        let result = Settings::from_toml("[compression]\ndefault_level = \"max\"\nworkers = 1");
        assert!(result.is_err());
    }
}

//! Configuration Module - defaults from ~/.config/mscz-recover/config.toml
//!
//! Values here sit between the built-in defaults and command-line flags:
//! a flag always wins, then the file, then the default.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::carve::DEFAULT_CHUNK_SIZE;

/// mscz-recover configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Scan settings
    pub scan: ScanConfig,
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Scan settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Bytes read per chunk
    pub chunk_size: u64,
    /// Where recovered archives are written
    pub output_dir: PathBuf,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            output_dir: PathBuf::from("out"),
        }
    }
}

impl Config {
    /// Load the default config file, or defaults if there is none
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.is_file() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        Ok(config)
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "mscz-recover")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".mscz-recover")
                    .join("config.toml")
            })
    }
}

/// Generate a sample config file with comments
pub fn generate_sample_config() -> String {
    r#"# mscz-recover configuration

[general]
# Log level: "trace", "debug", "info", "warn", "error"
# --verbose on the command line forces "debug"
log_level = "info"

[scan]
# Bytes read per chunk (must be larger than 8)
chunk_size = 16000000

# Directory for recovered .mscz files, created if missing
output_dir = "out"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.scan.chunk_size, 16_000_000);
        assert_eq!(config.scan.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_sample_matches_defaults() {
        let config: Config = toml::from_str(&generate_sample_config()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[scan]\nchunk_size = 4096\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.scan.chunk_size, 4096);
        assert_eq!(config.scan.output_dir, PathBuf::from("out"));
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[scan]\nchunk_size = \"big\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
        assert!(Config::load_from(&dir.path().join("missing.toml")).is_err());
    }
}

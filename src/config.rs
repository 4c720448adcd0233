use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::classify::SYSTEM_ROOTS;
use crate::size::LargeFileThreshold;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanSettings,

    #[serde(default)]
    pub duplicates: DuplicatesConfig,

    #[serde(default)]
    pub large_files: LargeFilesConfig,

    #[serde(default)]
    pub exclusions: Exclusions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Files between two progress snapshots
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,

    /// Entries between two cancellation checks in folder aggregation
    #[serde(default = "default_cancel_check_interval")]
    pub cancel_check_interval: u64,

    /// Skipped paths kept verbatim in a result (the rest are only counted)
    #[serde(default = "default_max_warning_samples")]
    pub max_warning_samples: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicatesConfig {
    #[serde(default = "default_min_duplicate_size")]
    pub min_size_bytes: u64,

    /// Read buffer used while hashing
    #[serde(default = "default_buffer_size")]
    pub buffer_size_bytes: usize,

    /// Compare the first bytes of same-size files before hashing them fully
    #[serde(default = "default_true")]
    pub prefix_hash: bool,

    #[serde(default = "default_prefix_hash_bytes")]
    pub prefix_hash_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LargeFilesConfig {
    #[serde(default)]
    pub default_threshold: LargeFileThreshold,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exclusions {
    /// Glob patterns (e.g. `**/important-project/**`)
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Directory names never walked, matched case-insensitively
    #[serde(default = "default_system_roots")]
    pub system_roots: Vec<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            progress_interval: default_progress_interval(),
            cancel_check_interval: default_cancel_check_interval(),
            max_warning_samples: default_max_warning_samples(),
        }
    }
}

impl Default for DuplicatesConfig {
    fn default() -> Self {
        Self {
            min_size_bytes: default_min_duplicate_size(),
            buffer_size_bytes: default_buffer_size(),
            prefix_hash: true,
            prefix_hash_bytes: default_prefix_hash_bytes(),
        }
    }
}

impl Default for LargeFilesConfig {
    fn default() -> Self {
        Self {
            default_threshold: LargeFileThreshold::Mb100,
        }
    }
}

impl Default for Exclusions {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            system_roots: default_system_roots(),
        }
    }
}

fn default_progress_interval() -> u64 { 25 }
fn default_cancel_check_interval() -> u64 { 64 }
fn default_max_warning_samples() -> usize { 100 }
fn default_min_duplicate_size() -> u64 { 1024 * 1024 }
fn default_buffer_size() -> usize { 1024 * 1024 }
fn default_prefix_hash_bytes() -> usize { 4096 }
fn default_true() -> bool { true }

fn default_system_roots() -> Vec<String> {
    SYSTEM_ROOTS.iter().map(|s| s.to_string()).collect()
}

impl Config {
    /// Config file path, e.g. `%APPDATA%\space-cleanser\config\config.toml`
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "space-cleanser")
            .context("Could not determine the user configuration directory")?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load config from the default location or return defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Ok(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                log::warn!("{:#}; using default configuration", e);
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    /// Load config from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, toml).context("Failed to write config file")?;

        Ok(())
    }

    /// Apply CLI option overrides
    pub fn apply_cli_overrides(
        &mut self,
        min_duplicate_size: Option<u64>,
        threshold: Option<LargeFileThreshold>,
        extra_exclusions: &[String],
    ) {
        if let Some(size) = min_duplicate_size {
            self.duplicates.min_size_bytes = size;
        }
        if let Some(threshold) = threshold {
            self.large_files.default_threshold = threshold;
        }
        self.exclusions
            .patterns
            .extend(extra_exclusions.iter().cloned());
    }
}

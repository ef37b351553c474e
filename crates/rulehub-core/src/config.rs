//! Configuration management for RuleHub.
//!
//! This module provides configuration loading, saving, and defaults.
//! Configuration is stored in TOML format in a platform-appropriate location.
//!
//! Older configurations may carry pluralized category keys (`rules`,
//! `prompts`, `workflows`) or category-tagged extensions such as
//! `.rule.md`. Both are migrated on load and the file is re-saved.

use crate::category::LEGACY_ALIASES;
use crate::error::{Result, RuleHubError};
use directories::{BaseDirs, ProjectDirs};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory name used under the home directory when no storage path is set
const DEFAULT_STORAGE_DIR: &str = ".ai-rule-hub";

/// Main configuration structure for RuleHub.
///
/// ## Example Configuration File (rulehub.toml)
///
/// ```toml
/// [general]
/// storage_path = "/home/me/.ai-rule-hub"
/// log_level = "info"
///
/// [categories.rule]
/// enabled = true
/// file_extensions = [".md"]
///
/// [categories.mcp]
/// enabled = true
/// file_extensions = [".json"]
///
/// [features]
/// show_file_counts = true
/// enable_search = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Category definitions keyed by category key
    pub categories: BTreeMap<String, CategoryConfig>,

    /// Feature toggles consumed by front ends
    pub features: FeaturesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            general: GeneralConfig::default(),
            categories: default_categories(),
            features: FeaturesConfig::default(),
        }
    }
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Library root (None = `~/.ai-rule-hub`)
    pub storage_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            storage_path: None,
            log_level: "info".to_string(),
        }
    }
}

/// A single category definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Whether the category participates in queries
    pub enabled: bool,

    /// Allowed filename suffixes (empty = any file)
    pub file_extensions: Vec<String>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        CategoryConfig {
            enabled: true,
            file_extensions: Vec::new(),
        }
    }
}

impl CategoryConfig {
    fn with_extensions(exts: &[&str]) -> Self {
        CategoryConfig {
            enabled: true,
            file_extensions: exts.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Feature toggles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Show per-category file counts
    pub show_file_counts: bool,

    /// Enable the search filter
    pub enable_search: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        FeaturesConfig {
            show_file_counts: true,
            enable_search: true,
        }
    }
}

/// The built-in category set
fn default_categories() -> BTreeMap<String, CategoryConfig> {
    let mut categories = BTreeMap::new();
    categories.insert("rule".to_string(), CategoryConfig::with_extensions(&[".md"]));
    categories.insert("prompt".to_string(), CategoryConfig::with_extensions(&[".md"]));
    categories.insert("mcp".to_string(), CategoryConfig::with_extensions(&[".json"]));
    categories.insert("agent".to_string(), CategoryConfig::with_extensions(&[".md"]));
    categories.insert("workflow".to_string(), CategoryConfig::with_extensions(&[".md"]));
    categories
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default config if no config file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    ///
    /// Legacy category keys and tagged extensions are migrated; when that
    /// changes anything the migrated configuration is written back.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents).map_err(|e| RuleHubError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
        })?;

        let keys_changed = config.normalize_category_keys();
        let exts_changed = config.normalize_extensions()?;
        if keys_changed || exts_changed {
            info!(
                keys_changed,
                exts_changed, "Migrated legacy configuration entries"
            );
            config.save_to(path)?;
        }

        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Saving configuration");
        let contents = toml::to_string_pretty(self).map_err(|e| RuleHubError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "rulehub").ok_or_else(|| RuleHubError::ConfigError {
            reason: "Could not determine config directory".to_string(),
        })?;

        Ok(dirs.config_dir().join("rulehub.toml"))
    }

    /// Get the default library root (`~/.ai-rule-hub`).
    pub fn default_storage_path() -> Result<PathBuf> {
        let dirs = BaseDirs::new().ok_or_else(|| RuleHubError::ConfigError {
            reason: "Could not determine home directory".to_string(),
        })?;

        Ok(dirs.home_dir().join(DEFAULT_STORAGE_DIR))
    }

    /// Get the library root (from config or default).
    pub fn storage_root(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.general.storage_path {
            Ok(path.clone())
        } else {
            Self::default_storage_path()
        }
    }

    /// Rename pluralized legacy keys to their current key.
    ///
    /// A legacy entry is only moved when the current key is absent, so an
    /// explicit current definition always wins.
    fn normalize_category_keys(&mut self) -> bool {
        let mut changed = false;
        for (legacy, current) in LEGACY_ALIASES {
            if self.categories.contains_key(*current) {
                continue;
            }
            if let Some(entry) = self.categories.remove(*legacy) {
                self.categories.insert(current.to_string(), entry);
                changed = true;
            }
        }
        changed
    }

    /// Reset extensions of built-in categories to their generic suffixes.
    ///
    /// Categories outside the built-in set keep their extensions unless they
    /// carry a category-tagged suffix, in which case they are cleared.
    fn normalize_extensions(&mut self) -> Result<bool> {
        let tagged = category_tagged_suffix()?;
        let defaults = default_categories();
        let mut changed = false;

        for (key, category) in self.categories.iter_mut() {
            let has_tagged = category.file_extensions.iter().any(|e| tagged.is_match(e));
            let wanted = match defaults.get(key) {
                Some(d) => d.file_extensions.clone(),
                None if has_tagged => Vec::new(),
                None => continue,
            };
            if has_tagged || category.file_extensions != wanted {
                category.file_extensions = wanted;
                changed = true;
            }
        }
        Ok(changed)
    }
}

fn category_tagged_suffix() -> Result<Regex> {
    Regex::new(r"(?i)\.(rule|prompt|agent|workflow|mcp)\.?").map_err(|e| {
        RuleHubError::ConfigError {
            reason: format!("Invalid extension pattern: {}", e),
        }
    })
}

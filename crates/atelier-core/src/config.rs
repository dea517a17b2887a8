//! Configuration management for Atelier
//!
//! Editing-session settings live in `.atelier/config.toml` next to the site:
//! history retention, path strictness, id strategy, extra theme presets and
//! the assistant context window.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::{AtelierError, IdGenerator, PathResolver, Result, SequentialIds, UuidIds};

/// Site-level Atelier configuration
///
/// Loaded from `.atelier/config.toml` in the site root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtelierConfig {
    /// Undo history retention
    #[serde(default)]
    pub history: HistoryConfig,

    /// Path write behaviour
    #[serde(default)]
    pub paths: PathConfig,

    /// Id generation for new items and history entries
    #[serde(default)]
    pub ids: IdConfig,

    /// Extra theme presets, merged over the built-in table
    #[serde(default)]
    pub presets: Vec<PresetConfig>,

    /// Context handed to the external assistant
    #[serde(default)]
    pub assistant: AssistantConfig,
}

/// History retention settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of batches kept; oldest are evicted first
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

/// Path resolution settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathConfig {
    /// Reject writes that would replace a scalar found mid-path
    #[serde(default)]
    pub strict: bool,
}

/// Id strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    #[default]
    Uuid,
    Sequential,
}

/// Id generation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdConfig {
    #[serde(default)]
    pub strategy: IdStrategy,

    /// Namespace for sequential ids (ignored for UUIDs)
    #[serde(default)]
    pub namespace: Option<String>,
}

/// A named theme color pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub primary: String,
    pub secondary: String,
}

/// Assistant context settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Number of recent batches summarised for the assistant
    #[serde(default = "default_recent_actions")]
    pub recent_actions: usize,
}

// Default value providers
fn default_max_entries() -> usize {
    50
}

fn default_recent_actions() -> usize {
    5
}

impl AtelierConfig {
    /// Load configuration from `.atelier/config.toml` or use defaults
    pub fn load_or_default(site_root: &Path) -> Result<Self> {
        let config_path = site_root.join(".atelier/config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AtelierError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Write default configuration to `.atelier/config.toml`
    pub fn write_default(site_root: &Path) -> Result<()> {
        let config_dir = site_root.join(".atelier");
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let config = Self::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| AtelierError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for preset in &self.presets {
            if preset.id.trim().is_empty() {
                return Err(AtelierError::Config("preset with empty id".to_string()));
            }
        }
        Ok(())
    }

    /// Retention cap, never below one entry
    pub fn max_history_entries(&self) -> usize {
        self.history.max_entries.max(1)
    }

    pub fn path_resolver(&self) -> PathResolver {
        PathResolver::with_strict(self.paths.strict)
    }

    /// Build the configured id generator
    pub fn id_generator(&self) -> Arc<dyn IdGenerator> {
        match self.ids.strategy {
            IdStrategy::Uuid => Arc::new(UuidIds),
            IdStrategy::Sequential => match &self.ids.namespace {
                Some(ns) => Arc::new(SequentialIds::with_namespace(ns.clone())),
                None => Arc::new(SequentialIds::new()),
            },
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            recent_actions: default_recent_actions(),
        }
    }
}

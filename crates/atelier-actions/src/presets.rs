//! Named theme presets

use atelier_core::{AtelierError, PresetConfig, Result};
use serde::{Deserialize, Serialize};

/// A named `{primary, secondary}` color pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub id: String,
    pub name: String,
    pub primary: String,
    pub secondary: String,
}

impl Preset {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        primary: impl Into<String>,
        secondary: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }
}

impl From<PresetConfig> for Preset {
    fn from(config: PresetConfig) -> Self {
        let name = config.name.unwrap_or_else(|| config.id.clone());
        Self::new(config.id, name, config.primary, config.secondary)
    }
}

/// Built-in presets shipped with every site
pub fn builtin_presets() -> Vec<Preset> {
    vec![
        Preset::new("ocean", "Ocean", "#0ea5e9", "#0369a1"),
        Preset::new("forest", "Forest", "#16a34a", "#14532d"),
        Preset::new("sunset", "Sunset", "#f97316", "#be123c"),
        Preset::new("lavender", "Lavender", "#8b5cf6", "#4c1d95"),
        Preset::new("midnight", "Midnight", "#1e293b", "#6366f1"),
        Preset::new("rose", "Rose", "#e11d48", "#fda4af"),
        Preset::new("sand", "Sand", "#d4a373", "#6b4f2a"),
        Preset::new("monochrome", "Monochrome", "#111827", "#6b7280"),
    ]
}

/// Ordered preset table, looked up case-insensitively by id
#[derive(Debug, Clone)]
pub struct PresetCatalog {
    presets: Vec<Preset>,
}

impl Default for PresetCatalog {
    fn default() -> Self {
        Self {
            presets: builtin_presets(),
        }
    }
}

impl PresetCatalog {
    pub fn new(presets: Vec<Preset>) -> Self {
        Self { presets }
    }

    /// Built-in table with configured presets merged over it
    ///
    /// A configured preset with a built-in id replaces it in place; new ids
    /// are appended.
    pub fn with_overrides(configs: &[PresetConfig]) -> Self {
        let mut catalog = Self::default();
        for config in configs {
            catalog.insert(Preset::from(config.clone()));
        }
        catalog
    }

    pub fn insert(&mut self, preset: Preset) {
        match self
            .presets
            .iter_mut()
            .find(|p| p.id.eq_ignore_ascii_case(&preset.id))
        {
            Some(existing) => *existing = preset,
            None => self.presets.push(preset),
        }
    }

    pub fn get(&self, id: &str) -> Result<&Preset> {
        let id = id.trim();
        self.presets
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| AtelierError::PresetNotFound(id.to_string()))
    }

    pub fn list(&self) -> &[Preset] {
        &self.presets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = PresetCatalog::default();
        assert_eq!(catalog.get("Ocean").unwrap().primary, "#0ea5e9");
        assert_eq!(catalog.get(" forest ").unwrap().id, "forest");
    }

    #[test]
    fn test_unknown_preset() {
        let err = PresetCatalog::default().get("neon").unwrap_err();
        assert!(matches!(err, AtelierError::PresetNotFound(ref id) if id == "neon"));
    }

    #[test]
    fn test_overrides_replace_and_append() {
        let catalog = PresetCatalog::with_overrides(&[
            PresetConfig {
                id: "ocean".to_string(),
                name: Some("Deep Ocean".to_string()),
                primary: "#000080".to_string(),
                secondary: "#000040".to_string(),
            },
            PresetConfig {
                id: "brand".to_string(),
                name: None,
                primary: "#ff0066".to_string(),
                secondary: "#220011".to_string(),
            },
        ]);

        let builtin_count = builtin_presets().len();
        assert_eq!(catalog.list().len(), builtin_count + 1);
        assert_eq!(catalog.list()[0].name, "Deep Ocean");
        assert_eq!(catalog.get("brand").unwrap().name, "brand");
    }
}

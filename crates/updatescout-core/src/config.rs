use crate::filters::{FilterSet, SortOrder};
use crate::normalize::NormalizeOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// Loaded from `<config_dir>/updatescout/config.toml`; missing file or
/// missing keys fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: FilterDefaults,
    #[serde(default)]
    pub normalization: NormalizeOptions,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Load config from default location, or defaults if there is none
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Save config to the default location, returning where it went
    pub fn save(&self) -> crate::Result<PathBuf> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&config_path, self.to_toml()?)?;
        Ok(config_path)
    }

    pub fn to_toml(&self) -> crate::Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    pub fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("updatescout");

        Ok(config_dir.join("config.toml"))
    }

    /// Filter set used when nothing is stored yet
    pub fn default_filters(&self) -> FilterSet {
        FilterSet {
            horizon_months: self.defaults.horizon_months,
            history_months: self.defaults.history_months,
            sort_order: self.defaults.sort_order,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterDefaults {
    /// Hide items available further out than this many months
    #[serde(default = "default_horizon")]
    pub horizon_months: Option<u32>,

    /// Hide items older than this many months
    #[serde(default = "default_history")]
    pub history_months: Option<u32>,

    #[serde(default)]
    pub sort_order: SortOrder,
}

fn default_horizon() -> Option<u32> {
    Some(12)
}

fn default_history() -> Option<u32> {
    Some(6)
}

impl Default for FilterDefaults {
    fn default() -> Self {
        Self {
            horizon_months: default_horizon(),
            history_months: default_history(),
            sort_order: SortOrder::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Where filter state lives (defaults to the platform data dir)
    #[serde(default)]
    pub state_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_export_title")]
    pub title: String,

    #[serde(default = "default_include_summary")]
    pub include_summary: bool,
}

fn default_export_title() -> String {
    "Product Updates".to_string()
}

fn default_include_summary() -> bool {
    true
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: default_export_title(),
            include_summary: default_include_summary(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::SourceMatch;
    use crate::normalize::EmptySelectionPolicy;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.defaults.horizon_months, Some(12));
        assert_eq!(config.defaults.history_months, Some(6));
        assert_eq!(config.export.title, "Product Updates");
        assert_eq!(
            config.normalization.empty_selection,
            EmptySelectionPolicy::Unrestricted
        );
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.normalization.empty_selection = EmptySelectionPolicy::Restrictive;
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("horizon_months"));
        assert!(toml.contains("empty_selection = \"restrictive\""));

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, toml).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(
            loaded.normalization.empty_selection,
            EmptySelectionPolicy::Restrictive
        );
    }

    #[test]
    fn test_partial_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[normalization]\nsource_match = \"all\"\n\n[defaults]\nsort_order = \"oldest\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.normalization.source_match, SourceMatch::All);
        assert_eq!(config.defaults.sort_order, SortOrder::Oldest);
        assert_eq!(config.defaults.horizon_months, Some(12));
        assert!(config.export.include_summary);
    }

    #[test]
    fn test_default_filters_follow_config() {
        let mut config = Config::default();
        config.defaults.history_months = None;
        let filters = config.default_filters();
        assert_eq!(filters.horizon_months, Some(12));
        assert_eq!(filters.history_months, None);
    }

    #[test]
    fn test_bad_config_is_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "defaults = 5").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(crate::Error::ConfigError(_))
        ));
    }
}

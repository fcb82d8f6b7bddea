//! Engine configuration.
//!
//! `#[serde(default)]` on every section keeps partial config files valid:
//! anything missing falls back to `Default::default()`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use synergy_buffer::Geometry;

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which highlighters run
    pub highlighting: HighlightingConfig,

    /// Bracket-block connector settings
    pub brackets: BracketConfig,

    /// Background worker tuning
    pub workers: WorkerConfig,

    /// Language definition storage
    pub registry: RegistryConfig,

    /// Layout metrics for the built-in document surface
    pub view: Geometry,
}

impl Config {
    /// Loads config from the default location.
    pub fn load() -> Self {
        Self::load_from_default_path().unwrap_or_default()
    }

    /// Loads config from a file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads from the default config path.
    fn load_from_default_path() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default config file path.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("synergy").join("config.toml"))
    }

    /// Saves the config to a file, creating parent directories.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Highlighter switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightingConfig {
    /// Run the keyword worker
    pub keywords_enabled: bool,

    /// Run the bracket-block worker
    pub brackets_enabled: bool,
}

impl Default for HighlightingConfig {
    fn default() -> Self {
        Self {
            keywords_enabled: true,
            brackets_enabled: true,
        }
    }
}

/// Bracket-block settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BracketConfig {
    /// Opening delimiter
    pub open: char,

    /// Closing delimiter
    pub close: char,

    /// Connector color, as a `solid(R,G,B[,A])` descriptor
    pub stroke: String,

    /// Dash and gap lengths of the connector
    pub dash: [f64; 2],
}

impl Default for BracketConfig {
    fn default() -> Self {
        Self {
            open: '{',
            close: '}',
            stroke: "solid(211,211,211)".to_string(),
            dash: [4.0, 3.0],
        }
    }
}

/// Background worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// How long an idle worker sleeps before polling again (ms)
    pub idle_poll_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { idle_poll_ms: 25 }
    }
}

impl WorkerConfig {
    pub fn idle_poll(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.idle_poll_ms.max(1))
    }
}

/// Where language definitions live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Directory holding the mapping file and `languages/`.
    /// `None` means `<data dir>/synergy`.
    pub root: Option<PathBuf>,

    /// Name of the extension/name mapping file
    pub mapping_file: String,

    /// Subdirectory for copied definition files
    pub definitions_dir: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            root: None,
            mapping_file: "languages.json".to_string(),
            definitions_dir: "languages".to_string(),
        }
    }
}

impl RegistryConfig {
    /// Resolves the registry root directory.
    pub fn root_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => {
                let data_dir = dirs::data_dir().ok_or(ConfigError::NoConfigDir)?;
                Ok(data_dir.join("synergy"))
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config directory not found")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.highlighting.keywords_enabled);
        assert_eq!(config.brackets.open, '{');
        assert_eq!(config.brackets.close, '}');
        assert_eq!(config.registry.mapping_file, "languages.json");
        assert_eq!(config.view.line_height, 16.0);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.brackets.dash, config.brackets.dash);
        assert_eq!(parsed.workers.idle_poll_ms, config.workers.idle_poll_ms);
    }

    #[test]
    fn test_partial_config() {
        let parsed: Config = toml::from_str(
            r#"
            [brackets]
            open = "("
            close = ")"

            [registry]
            root = "/tmp/synergy"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.brackets.open, '(');
        assert_eq!(parsed.brackets.stroke, "solid(211,211,211)");
        assert_eq!(parsed.registry.root_dir().unwrap(), PathBuf::from("/tmp/synergy"));
        assert!(parsed.highlighting.brackets_enabled);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.workers.idle_poll_ms = 7;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.workers.idle_poll_ms, 7);
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_tab_size")]
    pub tab_size: usize,

    #[serde(default = "default_file_name")]
    pub default_file_name: String,

    #[serde(default = "default_documents_dir")]
    pub documents_dir: String,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub highlight: HighlightConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Absent means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightConfig {
    #[serde(default = "default_highlight_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub extra_keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

fn default_tab_size() -> usize {
    4
}

fn default_file_name() -> String {
    "untitled.txt".to_string()
}

fn default_documents_dir() -> String {
    if let Some(home) = dirs::home_dir() {
        home.join("Documents").to_string_lossy().to_string()
    } else {
        ".".to_string()
    }
}

fn default_highlight_enabled() -> bool {
    true
}

impl Default for HighlightConfig {
    fn default() -> Self {
        HighlightConfig {
            enabled: default_highlight_enabled(),
            extra_keywords: Vec::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tab_size: default_tab_size(),
            default_file_name: default_file_name(),
            documents_dir: default_documents_dir(),
            history: HistoryConfig::default(),
            highlight: HighlightConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load from the user config directory, writing defaults on first run.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Create default config file if it doesn't exist
                let default_config = Self::default();
                default_config.save_to(path)?;
                return Ok(default_config);
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut config: Config = toml::from_str(&contents)?;
        config.documents_dir = expand_tilde(&config.documents_dir);
        if let Some(file) = &config.logging.file {
            config.logging.file = Some(expand_tilde(file));
        }
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string).map_err(io_err)?;

        Ok(())
    }

    /// Resolve a user-typed path against `documents_dir`.
    pub fn resolve_path(&self, input: &str) -> PathBuf {
        let expanded = PathBuf::from(expand_tilde(input.trim()));
        if expanded.is_absolute() {
            expanded
        } else {
            Path::new(&self.documents_dir).join(expanded)
        }
    }

    pub fn log_path(&self) -> PathBuf {
        match &self.logging.file {
            Some(file) => PathBuf::from(file),
            None => Self::app_dir().join("quill.log"),
        }
    }

    pub fn config_path() -> PathBuf {
        Self::app_dir().join("config.toml")
    }

    fn app_dir() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("quill");
        path
    }
}

fn expand_tilde(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = toml::from_str("tab_size = 2\n").unwrap();
        assert_eq!(config.tab_size, 2);
        assert_eq!(config.default_file_name, "untitled.txt");
        assert_eq!(config.history.max_depth, None);
        assert!(config.highlight.enabled);
    }

    #[test]
    fn nested_sections_parse() {
        let config: Config = toml::from_str(
            r#"
            [history]
            max_depth = 50

            [highlight]
            enabled = false
            extra_keywords = ["when", "is"]

            [logging]
            filter = "quill=debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.history.max_depth, Some(50));
        assert!(!config.highlight.enabled);
        assert_eq!(config.highlight.extra_keywords, vec!["when", "is"]);
        assert_eq!(config.logging.filter.as_deref(), Some("quill=debug"));
    }

    #[test]
    fn first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "tab_size = \"wide\"").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn relative_paths_resolve_against_documents_dir() {
        let config = Config {
            documents_dir: "/srv/docs".into(),
            ..Config::default()
        };
        assert_eq!(
            config.resolve_path("notes.txt"),
            PathBuf::from("/srv/docs/notes.txt")
        );
        assert_eq!(config.resolve_path("/tmp/a.kt"), PathBuf::from("/tmp/a.kt"));
    }
}

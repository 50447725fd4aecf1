use crate::models::{ErrorType, WarnList};
use crate::services::browser::BrowserKind;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Table holding the error-text patterns and their handling policy
pub const WARNS_SECTION: &str = "applescript_warns";

/// Suffix of the section holding a display's target extent
pub const TARGET_SUFFIX: &str = "_target";

#[derive(Error, Debug)]
pub enum ConfigParseError {
    #[error("File IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Missing configuration section: [{section}]")]
    MissingSection { section: String },
    #[error("Invalid configuration section [{section}]: {message}")]
    InvalidSection { section: String, message: String },
    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

/// Top-level settings of the configuration file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Display section names, in matching order
    #[serde(default)]
    pub display_names: Vec<String>,
    /// Application to focus once the viewer has been resized
    pub switch_back_app: Option<String>,
    /// Replacement for the bundled Preview script
    pub show_preview_script_path: Option<PathBuf>,
    /// Upper bound for each automation call; unbounded when unset
    pub automation_timeout_secs: Option<u64>,
    #[serde(default)]
    pub browser: BrowserKind,
    #[serde(skip)]
    pub applescript_warns: WarnList,
}

impl Settings {
    pub fn automation_timeout(&self) -> Option<Duration> {
        self.automation_timeout_secs.map(Duration::from_secs)
    }
}

/// A parsed configuration document
#[derive(Debug, Clone, Default)]
pub struct ShowFileConfig {
    pub settings: Settings,
    table: toml::Table,
}

impl ShowFileConfig {
    /// Deserialize the named section
    pub fn section<T: DeserializeOwned>(&self, name: &str) -> Result<T, ConfigParseError> {
        let value = self
            .table
            .get(name)
            .ok_or_else(|| ConfigParseError::MissingSection {
                section: name.to_string(),
            })?;

        if !value.is_table() {
            return Err(ConfigParseError::InvalidSection {
                section: name.to_string(),
                message: format!("expected a table, found {}", value.type_str()),
            });
        }

        value
            .clone()
            .try_into()
            .map_err(|e: toml::de::Error| ConfigParseError::InvalidSection {
                section: name.to_string(),
                message: e.message().to_string(),
            })
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.table.get(name).is_some_and(toml::Value::is_table)
    }
}

/// Location of the user configuration file
pub fn default_config_path() -> PathBuf {
    let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home_dir.join(".config").join("showfile").join("showfile.toml")
}

pub struct ConfigParser {
    warnings: Vec<String>,
}

impl ConfigParser {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Parse an explicit file, or the default file when it exists
    pub fn load(&mut self, path: Option<&Path>) -> Result<ShowFileConfig, ConfigParseError> {
        match path {
            Some(path) => self.parse_file(path),
            None => {
                let path = default_config_path();
                if path.exists() {
                    self.parse_file(&path)
                } else {
                    debug!("No configuration at {}, using defaults", path.display());
                    Ok(ShowFileConfig::default())
                }
            }
        }
    }

    pub fn parse_file<P: AsRef<Path>>(&mut self, path: P) -> Result<ShowFileConfig, ConfigParseError> {
        debug!("Reading configuration from {}", path.as_ref().display());
        let content = std::fs::read_to_string(path)?;
        self.parse_str(&content)
    }

    pub fn parse_str(&mut self, content: &str) -> Result<ShowFileConfig, ConfigParseError> {
        let table: toml::Table = toml::from_str(content)?;
        let mut settings: Settings = toml::Value::Table(table.clone()).try_into()?;
        settings.applescript_warns = self.parse_warns(&table)?;

        self.validate_settings(&settings)?;
        Ok(ShowFileConfig { settings, table })
    }

    pub fn get_warnings(&self) -> &[String] {
        &self.warnings
    }

    fn parse_warns(&self, table: &toml::Table) -> Result<WarnList, ConfigParseError> {
        let Some(value) = table.get(WARNS_SECTION) else {
            return Ok(WarnList::new());
        };

        let invalid = |message: String| ConfigParseError::InvalidSection {
            section: WARNS_SECTION.to_string(),
            message,
        };

        let warns = value
            .as_table()
            .ok_or_else(|| invalid(format!("expected a table, found {}", value.type_str())))?;

        warns
            .iter()
            .map(|(pattern, policy)| {
                let policy = policy
                    .as_str()
                    .ok_or_else(|| invalid(format!("policy for '{}' must be a string", pattern)))?;
                let error_type = policy.parse::<ErrorType>().map_err(invalid)?;
                Ok((pattern.clone(), error_type))
            })
            .collect()
    }

    fn validate_settings(&mut self, settings: &Settings) -> Result<(), ConfigParseError> {
        let mut names = std::collections::HashSet::new();

        for name in &settings.display_names {
            if name.trim().is_empty() {
                return Err(ConfigParseError::ValidationError {
                    message: "Display name cannot be empty".to_string(),
                });
            }

            if !names.insert(name.as_str()) {
                let message = format!("Display '{}' is listed more than once", name);
                warn!("{}", message);
                self.warnings.push(message);
            }
        }

        if settings.automation_timeout_secs == Some(0) {
            return Err(ConfigParseError::ValidationError {
                message: "automation_timeout_secs must be positive".to_string(),
            });
        }

        if let Some(app) = &settings.switch_back_app {
            if app.trim().is_empty() {
                return Err(ConfigParseError::ValidationError {
                    message: "switch_back_app cannot be empty".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Default for ConfigParser {
    fn default() -> Self {
        Self::new()
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use glirc_lua_runtime::logging::{self, LogConfig};

use crate::error::ConfigError;

/// Extension settings, read from TOML
///
/// ```toml
/// global_name = "glirc"
/// script = "~/.config/glirc/init.lua"
///
/// [logging]
/// level = "debug"
/// json = false
/// spans = false
/// file = "/tmp/glirc-lua.log"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// Global the library table is installed under
    #[serde(default = "default_global_name")]
    pub global_name: String,

    /// Script run once the library is installed
    #[serde(default)]
    pub script: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default = "default_false")]
    pub json: bool,

    #[serde(default = "default_false")]
    pub spans: bool,

    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            global_name: default_global_name(),
            script: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            spans: false,
            file: None,
        }
    }
}

fn default_global_name() -> String { "glirc".to_string() }
fn default_level() -> String { "info".to_string() }
fn default_false() -> bool { false }

fn is_lua_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

impl ExtensionConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_lua_name(&self.global_name) {
            return Err(ConfigError::Invalid(format!(
                "global_name '{}' is not a Lua identifier",
                self.global_name
            )));
        }
        if logging::parse_level(&self.logging.level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown log level '{}'",
                self.logging.level
            )));
        }
        Ok(())
    }
}

impl LoggingConfig {
    /// Runtime logging setup. Environment variables still take precedence
    /// through the subscriber's filter.
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            level: logging::parse_level(&self.level).unwrap_or(tracing::Level::INFO),
            log_path: self.file.clone(),
            json_format: self.json,
            show_spans: self.spans,
        }
    }
}

//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use parley_client::api::DEFAULT_BASE_URL;
use parley_session::{DEFAULT_PAGE_SIZE, SessionConfig};

const DEFAULT_UPLOADS_PAGE_SIZE: u32 = 10;

/// Configuration for parley
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Agent service root
    pub base_url: Option<String>,
    /// Page size of the usage and history views
    pub page_size: Option<u32>,
    /// Page size of the uploads view
    pub uploads_page_size: Option<u32>,
    /// Connection timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Remember the active conversation between runs
    pub persist_conversation: Option<bool>,
    /// Show the usage/history view from the start
    pub show_usage: Option<bool>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parley")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PARLEY_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                eprintln!("Warning: Failed to parse config file: {}", e);
                Self::default()
            }),
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            page_size: Some(DEFAULT_PAGE_SIZE),
            uploads_page_size: Some(DEFAULT_UPLOADS_PAGE_SIZE),
            timeout_secs: None,
            persist_conversation: Some(true),
            show_usage: Some(false),
        };

        default_config.save()?;
        Ok(path)
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.timeout_secs.filter(|s| *s > 0).map(Duration::from_secs)
    }

    pub fn persist_conversation(&self) -> bool {
        self.persist_conversation.unwrap_or(true)
    }

    /// Session settings, with unset or zero page sizes falling back to defaults
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            page_size: self
                .page_size
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_PAGE_SIZE),
            uploads_page_size: self
                .uploads_page_size
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_UPLOADS_PAGE_SIZE),
            show_usage: self.show_usage.unwrap_or(false),
        }
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# parley configuration file
# Place at ~/.config/parley/config.toml (Linux) or set PARLEY_CONFIG_PATH

# Agent service root
base_url = "http://127.0.0.1:8000/api"

# Rows per page in the usage and history views
page_size = 20

# Rows per page in the uploads view
uploads_page_size = 10

# Connection timeout in seconds (streams themselves never time out)
# timeout_secs = 10

# Remember the active conversation between runs
persist_conversation = true

# Show the usage/history view after every turn
show_usage = false
"#
}

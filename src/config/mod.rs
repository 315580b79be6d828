//! Application configuration

pub mod widget;

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use widget::{ConfigError, WidgetConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the concierge backend
    pub api_url: String,
    pub timeout_secs: u64,
    /// Optional TOML file with widget settings
    pub widget_config: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000".into(),
            timeout_secs: 60,
            widget_config: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            api_url: env::var("HOTPOT_API_URL").unwrap_or(defaults.api_url),
            timeout_secs: env::var("HOTPOT_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            widget_config: env::var("HOTPOT_WIDGET_CONFIG").ok().map(PathBuf::from),
        })
    }

    /// Widget settings from the configured file, or the built-in defaults
    pub fn load_widget(&self) -> Result<WidgetConfig, ConfigError> {
        match &self.widget_config {
            Some(path) => WidgetConfig::from_file(path),
            None => Ok(WidgetConfig::default()),
        }
    }
}

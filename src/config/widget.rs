//! Widget settings loaded from TOML files
//!
//! Every section is optional; a missing file section falls back to the
//! restaurant's standard menu and a two-guest default.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::catalog;
use crate::core::cart::DEFAULT_GUESTS;

/// Root widget configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Guest selector settings
    #[serde(default)]
    pub guests: GuestConfig,

    /// Menu data
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Canned messages sent by the widget's buttons
    #[serde(default)]
    pub messages: MessagesConfig,
}

impl WidgetConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: WidgetConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.guests.max == 0 {
            return Err(ConfigError::Validation("guests.max must be at least 1".into()));
        }
        if !(1..=self.guests.max).contains(&self.guests.default) {
            return Err(ConfigError::Validation(format!(
                "guests.default must be within 1..={}, got {}",
                self.guests.max, self.guests.default
            )));
        }
        if self.catalog.broths.is_empty() {
            return Err(ConfigError::Validation("catalog.broths is empty".into()));
        }
        let mut seen = HashSet::new();
        for broth in &self.catalog.broths {
            if !seen.insert(broth.as_str()) {
                return Err(ConfigError::Validation(format!("duplicate broth: {}", broth)));
            }
        }
        Ok(())
    }

    /// Whether `n` is offered by the guest selector
    pub fn accepts_guests(&self, n: u32) -> bool {
        (1..=self.guests.max).contains(&n)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestConfig {
    #[serde(default = "default_guests")]
    pub default: u32,

    /// Largest party the selector offers
    #[serde(default = "default_max_guests")]
    pub max: u32,
}

fn default_guests() -> u32 {
    DEFAULT_GUESTS
}

fn default_max_guests() -> u32 {
    6
}

impl Default for GuestConfig {
    fn default() -> Self {
        Self {
            default: default_guests(),
            max: default_max_guests(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Broth names in menu order
    #[serde(default = "catalog::default_broths")]
    pub broths: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            broths: catalog::default_broths(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "default_confirm_message")]
    pub confirm_order: String,
}

fn default_confirm_message() -> String {
    "确认下单".to_string()
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            confirm_order: default_confirm_message(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

//! Configuration for the autocomplete demo.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tui_autocomplete::AutocompleteConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Location relative fetch URLs are resolved against.
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_autocomplete")]
    pub autocomplete: AutocompleteConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

fn default_location() -> String {
    "http://127.0.0.1:8080/".to_string()
}

fn default_autocomplete() -> AutocompleteConfig {
    AutocompleteConfig::new().url("/names").object_data("name")
}

fn default_max_rows() -> usize {
    6
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_rows: default_max_rows(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            location: default_location(),
            autocomplete: default_autocomplete(),
            display: DisplayConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "autocomplete-demo")
            .map(|d| d.config_dir().join("config.toml"))
    }

    pub fn log_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "autocomplete-demo")
            .map(|d| d.data_dir().join("autocomplete-demo.log"))
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::modules::formats::TargetFormat;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub enum ThemePreference {
    #[default]
    System,
    Light,
    Dark,
}

/// User preferences read once at startup. Prism never writes this file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub theme_preference: ThemePreference,
    pub default_format: TargetFormat,
    pub preserve_metadata: bool,
    pub max_compression: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme_preference: ThemePreference::System,
            default_format: TargetFormat::Png,
            preserve_metadata: true,
            max_compression: false,
        }
    }
}

impl AppSettings {
    pub fn load() -> Self {
        Self::load_from(&Self::get_config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(contents) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed settings file");
                Self::default()
            }
        }
    }

    pub fn get_config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("prism");
        path.push("settings.json");
        path
    }
}

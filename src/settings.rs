use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ja,
    En,
}

// App settings, persisted as one object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    pub theme: Theme,
    pub language: Language,
    pub notifications: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            language: Language::Ja,
            notifications: true,
        }
    }
}

impl AppSettings {
    /// Replace a single field by name, the way the settings page edits one control at a time.
    pub fn set_field(&mut self, key: &str, value: Value) -> Result<()> {
        let invalid = |e: serde_json::Error| AppError::Validation(format!("{}: {}", key, e));
        match key {
            "theme" => self.theme = serde_json::from_value(value).map_err(invalid)?,
            "language" => self.language = serde_json::from_value(value).map_err(invalid)?,
            "notifications" => self.notifications = serde_json::from_value(value).map_err(invalid)?,
            _ => {
                return Err(AppError::Validation(format!(
                    "Unknown setting '{}'. Must be one of: theme, language, notifications",
                    key
                )))
            }
        }
        Ok(())
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ai;
use crate::suggestions::ANALYSIS_THRESHOLD;
use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Id or email of the user commands act on
    #[serde(default)]
    pub current_user: Option<String>,
    #[serde(default)]
    pub ai: AiSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default = "default_current_theme")]
    pub current_theme: String,
    #[serde(default)]
    pub themes: HashMap<String, Theme>,
    #[serde(default = "default_status_timeout")]
    pub status_timeout_secs: u64,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Empty means "read TMK_GEMINI_API_KEY"
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_threshold")]
    pub analysis_threshold: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_fg")]
    pub fg: String,
    #[serde(default = "default_bg")]
    pub bg: String,
    #[serde(default = "default_highlight_bg")]
    pub highlight_bg: String,
    #[serde(default = "default_highlight_fg")]
    pub highlight_fg: String,
    #[serde(default = "default_tab_bg")]
    pub tab_bg: String,
    #[serde(default = "default_done_fg")]
    pub done_fg: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            current_user: None,
            ai: AiSettings::default(),
            notifications: NotificationSettings::default(),
            current_theme: default_current_theme(),
            themes: HashMap::new(),
            status_timeout_secs: default_status_timeout(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model: default_model(),
            endpoint: default_endpoint(),
            api_key: String::new(),
            analysis_threshold: default_threshold(),
        }
    }
}

impl AiSettings {
    /// Key from the config file, falling back to the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.trim().is_empty() {
            return Some(self.api_key.trim().to_string());
        }
        std::env::var(ai::API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    /// Gemini client for these settings; `None` when AI is turned off
    pub fn client(&self) -> Result<Option<ai::GeminiClient>, ai::AiError> {
        if !self.enabled {
            return Ok(None);
        }
        let api_key = self.resolved_api_key().ok_or(ai::AiError::MissingApiKey)?;
        ai::GeminiClient::new(api_key, self.model.clone(), self.endpoint.clone()).map(Some)
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: default_fg(),
            bg: default_bg(),
            highlight_bg: default_highlight_bg(),
            highlight_fg: default_highlight_fg(),
            tab_bg: default_tab_bg(),
            done_fg: default_done_fg(),
        }
    }
}

impl Theme {
    /// Themes that are always available
    pub fn get_preset_themes() -> HashMap<String, Theme> {
        let mut themes = HashMap::new();
        themes.insert("default".to_string(), Theme::default());
        themes.insert(
            "dark".to_string(),
            Theme {
                highlight_bg: "cyan".to_string(),
                highlight_fg: "black".to_string(),
                ..Theme::default()
            },
        );
        themes.insert(
            "light".to_string(),
            Theme {
                fg: "black".to_string(),
                bg: "white".to_string(),
                done_fg: "#008000".to_string(),
                ..Theme::default()
            },
        );
        themes
    }
}

fn default_database_path() -> String {
    Config::default_database_path_for_profile(utils::Profile::Prod)
}

fn default_current_theme() -> String {
    "default".to_string()
}

fn default_status_timeout() -> u64 {
    3
}

fn default_true() -> bool {
    true
}

fn default_model() -> String {
    ai::DEFAULT_MODEL.to_string()
}

fn default_endpoint() -> String {
    ai::DEFAULT_ENDPOINT.to_string()
}

fn default_threshold() -> usize {
    ANALYSIS_THRESHOLD
}

fn default_fg() -> String {
    "white".to_string()
}

fn default_bg() -> String {
    "black".to_string()
}

fn default_highlight_bg() -> String {
    "blue".to_string()
}

fn default_highlight_fg() -> String {
    "white".to_string()
}

fn default_tab_bg() -> String {
    "gray".to_string()
}

fn default_done_fg() -> String {
    "green".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Theme not found: {0}")]
    ThemeNotFound(String),
}

impl Config {
    /// Load the profile's config file, writing a default one if it is missing
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;
        let mut config = Self::load_from_path(&config_path)?;
        if !config_path.exists() {
            config.database_path = Self::default_database_path_for_profile(profile);
            config.save_to_path(&config_path)?;
        }
        Ok(config)
    }

    /// Load a config file; a missing file yields the defaults
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let contents =
            fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn save_to_path(&mut self, path: &Path) -> Result<(), ConfigError> {
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        log::debug!("saved config to {}", path.display());
        Ok(())
    }

    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile).ok_or_else(|| {
            ConfigError::ConfigDirError("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("config.toml"))
    }

    fn default_database_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("tmk.db").to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/tmk-dev/tmk.db".to_string(),
                utils::Profile::Prod => "~/.local/share/tmk/tmk.db".to_string(),
            }
        }
    }

    /// Database path with `~` expanded
    pub fn get_database_path(&self) -> PathBuf {
        utils::expand_path(&self.database_path)
    }

    /// The selected theme; unknown names fall back to the default preset
    pub fn get_active_theme(&self) -> Theme {
        self.themes
            .get(&self.current_theme)
            .cloned()
            .or_else(|| Theme::get_preset_themes().remove(&self.current_theme))
            .unwrap_or_default()
    }

    pub fn set_theme(&mut self, name: &str) -> Result<(), ConfigError> {
        if !self.themes.contains_key(name) && !Theme::get_preset_themes().contains_key(name) {
            return Err(ConfigError::ThemeNotFound(name.to_string()));
        }
        self.current_theme = name.to_string();
        Ok(())
    }

    /// Preset and user-defined theme names, sorted
    pub fn get_available_themes(&self) -> Vec<String> {
        let mut names: Vec<String> = Theme::get_preset_themes().into_keys().collect();
        for name in self.themes.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.ai.enabled);
        assert_eq!(config.ai.model, ai::DEFAULT_MODEL);
        assert_eq!(config.ai.analysis_threshold, ANALYSIS_THRESHOLD);
        assert!(config.notifications.enabled);
        assert_eq!(config.status_timeout_secs, 3);
        assert!(config.current_user.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            "current_user = \"me@example.com\"\n[ai]\napi_key = \"k-123\"\nanalysis_threshold = 3\n",
        )
        .unwrap();
        assert_eq!(config.current_user.as_deref(), Some("me@example.com"));
        assert_eq!(config.ai.endpoint, ai::DEFAULT_ENDPOINT);
        assert_eq!(config.ai.analysis_threshold, 3);
        assert_eq!(config.ai.resolved_api_key().as_deref(), Some("k-123"));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("config.toml");
        let mut config = Config::default();
        config.current_user = Some("u1".to_string());
        config.database_path = "/tmp/tmk-test.db".to_string();
        config.set_theme("light").unwrap();
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.current_user.as_deref(), Some("u1"));
        assert_eq!(loaded.database_path, "/tmp/tmk-test.db");
        assert_eq!(loaded.get_active_theme().bg, "white");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_path(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.current_theme, "default");
    }

    #[test]
    fn unknown_theme_is_rejected() {
        let mut config = Config::default();
        assert!(matches!(config.set_theme("neon"), Err(ConfigError::ThemeNotFound(_))));
        assert_eq!(
            config.get_available_themes(),
            vec!["dark".to_string(), "default".to_string(), "light".to_string()]
        );
    }
}

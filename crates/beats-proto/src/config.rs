use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub equalizer: EqualizerConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Everything before `/v1/...`, e.g. `https://host/beats/1104`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// When false, commands are sent without requiring a session first.
    #[serde(default = "default_auth_required")]
    pub auth_required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Now-playing and queue refresh period.
    #[serde(default = "default_player_interval_ms")]
    pub player_interval_ms: u64,
    /// Session re-validation period.
    #[serde(default = "default_session_interval_secs")]
    pub session_interval_secs: u64,
}

/// Slider range for the preamp and band controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EqualizerConfig {
    #[serde(default = "default_min_db")]
    pub min_db: f64,
    #[serde(default = "default_max_db")]
    pub max_db: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Where the session token is kept between runs.
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_required: default_auth_required(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            player_interval_ms: default_player_interval_ms(),
            session_interval_secs: default_session_interval_secs(),
        }
    }
}

impl Default for EqualizerConfig {
    fn default() -> Self {
        Self {
            min_db: default_min_db(),
            max_db: default_max_db(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_auth_required() -> bool {
    true
}

fn default_player_interval_ms() -> u64 {
    1000
}

fn default_session_interval_secs() -> u64 {
    60
}

fn default_min_db() -> f64 {
    -20.0
}

fn default_max_db() -> f64 {
    20.0
}

fn default_token_file() -> PathBuf {
    platform::data_dir().join("session.json")
}

impl Config {
    /// Load from the default location, writing a default file on first run.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.backend.auth_required);
        assert_eq!(config.backend.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.polling.player_interval_ms, 1000);
        assert_eq!(config.polling.session_interval_secs, 60);
        assert_eq!(config.equalizer.min_db, -20.0);
        assert!(config.session.token_file.ends_with("beats/session.json"));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [backend]
            base_url = "https://jukebox.example/beats/1104"

            [polling]
            player_interval_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.base_url, "https://jukebox.example/beats/1104");
        assert!(config.backend.auth_required);
        assert_eq!(config.polling.player_interval_ms, 250);
        assert_eq!(config.polling.session_interval_secs, 60);
        assert_eq!(config.equalizer.max_db, 20.0);
    }
}

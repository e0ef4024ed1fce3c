mod types;

pub use types::*;

use crate::{Error, Result};
use std::{env, path::Path};
use tracing::debug;

/// Environment variables checked, in order, for the model API key.
pub const API_KEY_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

pub async fn load() -> Result<Config> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

    let mut config = load_from_path(&config_path).await?;
    config.apply_env(|key| env::var(key).ok());
    config.validate()?;

    Ok(config)
}

/// Reads a YAML config file. A missing file yields the defaults.
pub async fn load_from_path(config_path: &str) -> Result<Config> {
    if !Path::new(config_path).exists() {
        debug!("No configuration file at {}, using defaults", config_path);
        return Ok(Config::default());
    }

    debug!("Loading configuration from: {}", config_path);

    let config_str = tokio::fs::read_to_string(config_path).await?;
    let config: Config = serde_yaml::from_str(&config_str)?;

    Ok(config)
}

impl Config {
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = API_KEY_VARS
            .iter()
            .filter_map(|var| lookup(*var))
            .find(|value| !value.trim().is_empty())
        {
            self.llm.api_key = key;
        }

        if let Some(path) = lookup("PREFERENCES_DB_PATH") {
            self.server.database_path = path;
        }
    }

    /// Startup checks. A missing API key is fatal.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.trim().is_empty() {
            return Err(Error::config("API_KEY environment variable not set"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::config(format!(
                "llm.temperature must be within 0.0..=2.0, got {}",
                self.llm.temperature
            )));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::config("llm.timeout_secs must be greater than zero"));
        }
        if self.server.sessions.max_sessions == 0 {
            return Err(Error::config("server.sessions.max_sessions must be greater than zero"));
        }
        if self.camera.grab_command.is_empty() {
            return Err(Error::config("camera.grab_command must not be empty"));
        }
        Ok(())
    }
}

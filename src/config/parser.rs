use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ConfigError;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub bot_token: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArchiveConfig {
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            backup_dir: default_backup_dir(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("DISCORD_ARCHIVER_AUTH_BOT_TOKEN") {
            self.auth.bot_token = value;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.bot_token.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "auth.bot_token must not be empty".to_string(),
            ));
        }
        if self.archive.backup_dir.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "archive.backup_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_backup_dir() -> String {
    "backup".to_string()
}

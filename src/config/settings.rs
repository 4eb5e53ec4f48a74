use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::stats::{HEATMAP_DAYS, HISTORY_DAYS};
use crate::sync::{DEFAULT_WINDOW, SyncPolicy};

fn default_debounce_ms() -> u64 {
    DEFAULT_WINDOW.as_millis() as u64
}
fn default_history_days() -> usize {
    HISTORY_DAYS
}
fn default_heatmap_days() -> usize {
    HEATMAP_DAYS
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    /// Used when `--user` is not given.
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Quiet window before a background sync runs.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_history_days")]
    pub history_days: usize,
    #[serde(default = "default_heatmap_days")]
    pub heatmap_days: usize,
    #[serde(default)]
    pub policy: SyncPolicy,
    /// Start in offline mode when false.
    #[serde(default = "default_true")]
    pub online: bool,
    /// Remote database file; defaults to `remote.db` in the data directory.
    #[serde(default)]
    pub remote_db: Option<PathBuf>,
}

impl SyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            history_days: default_history_days(),
            heatmap_days: default_heatmap_days(),
            policy: SyncPolicy::default(),
            online: true,
            remote_db: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl AppConfig {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "hijra").context("Could not determine project directories")
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn db_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("hijra.db"))
    }

    pub fn remote_db_path(&self) -> Result<PathBuf> {
        match &self.sync.remote_db {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("remote.db")),
        }
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).with_context(|| format!("Reading {:?}", path))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Parsing config.toml")
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("Serializing config")?;
        std::fs::write(&path, content).with_context(|| format!("Writing {:?}", path))?;
        Ok(())
    }

    pub fn ensure_data_dir() -> Result<PathBuf> {
        let dir = Self::data_dir()?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.sync.debounce_ms, 2000);
        assert_eq!(config.sync.history_days, 30);
        assert_eq!(config.sync.heatmap_days, 14);
        assert_eq!(config.sync.policy, SyncPolicy::RequireAll);
        assert!(config.sync.online);
        assert!(config.user.id.is_empty());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::parse(
            r#"
            [user]
            id = "abc"

            [sync]
            policy = "best_effort"
            debounce_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.user.id, "abc");
        assert_eq!(config.sync.policy, SyncPolicy::BestEffort);
        assert_eq!(config.sync.debounce(), Duration::from_millis(500));
        assert_eq!(config.sync.history_days, 30);
    }

    #[test]
    fn saved_form_parses_back() {
        let mut config = AppConfig::default();
        config.user.id = "u1".into();
        config.sync.online = false;
        let text = toml::to_string_pretty(&config).unwrap();
        let back = AppConfig::parse(&text).unwrap();
        assert_eq!(back.user.id, "u1");
        assert!(!back.sync.online);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(AppConfig::parse("[sync]\npolicy = \"sometimes\"").is_err());
    }
}

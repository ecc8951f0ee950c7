//! Configuration and credential storage

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::auth::StoredToken;

/// Application configuration, persisted as TOML in the user config dir.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the Campus backend (e.g. `https://campus.example.edu`).
    pub server_url: Option<String>,
    /// Short-lived access token for REST and the realtime channel.
    pub access_token: Option<StoredToken>,
    /// Long-lived refresh token.
    pub refresh_token: Option<String>,
    /// Our own user id (from the last login).
    pub user_id: Option<String>,
    /// Our display name (from the last login).
    pub display_name: Option<String>,
}

impl Config {
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("edu", "campus", "campus-cli")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from disk.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir).context("Failed to create config directory")?;

        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;

        // Restrictive permissions: the file contains tokens.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }

    pub fn require_server_url(&self) -> Result<&str> {
        self.server_url
            .as_deref()
            .context("No server configured. Run 'campus-cli login --server <url>' first.")
    }

    pub fn set_access_token(&mut self, token: String, expires_in: Option<u64>) {
        self.access_token = Some(StoredToken::new(token, expires_in));
    }

    pub fn clear_session(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.user_id = None;
        self.display_name = None;
    }
}

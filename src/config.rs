// Connection settings for the mailcow API. Values come from an optional
// TOML file in the user's config directory and are overridden by the
// `MAILCOW_API_HOST` / `MAILCOW_API_KEY` environment variables.

use crate::error::{MailcowError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const HOST_VAR: &str = "MAILCOW_API_HOST";
pub const KEY_VAR: &str = "MAILCOW_API_KEY";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the mailcow instance, e.g. `https://mail.example.org`.
    pub api_host: String,
    /// Read-write API key sent as `X-API-Key`.
    pub api_key: String,
}

#[derive(Deserialize, Debug, Default)]
struct FileConfig {
    api_host: Option<String>,
    api_key: Option<String>,
}

impl Config {
    pub fn new(api_host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Config {
            api_host: api_host.into(),
            api_key: api_key.into(),
        }
    }

    /// Default location of the config file:
    /// `<config_dir>/mailcow-admin/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mailcow-admin").join("config.toml"))
    }

    /// Load from the default file (if present) and the environment.
    pub fn load() -> Result<Self> {
        let file = match Self::default_path() {
            Some(path) if path.exists() => read_file(&path)?,
            _ => FileConfig::default(),
        };
        resolve(file, |var| std::env::var(var).ok())
    }

    /// Load from a specific file, still letting the environment override it.
    pub fn from_path(path: &Path) -> Result<Self> {
        resolve(read_file(path)?, |var| std::env::var(var).ok())
    }
}

fn read_file(path: &Path) -> Result<FileConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| MailcowError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    tracing::debug!("loaded config file {}", path.display());
    toml::from_str(&raw)
        .map_err(|e| MailcowError::Config(format!("cannot parse {}: {}", path.display(), e)))
}

fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let pick = |var: &str, fallback: Option<String>| {
        env(var)
            .or(fallback)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| MailcowError::Config(format!("{} is not set", var)))
    };
    Ok(Config {
        api_host: pick(HOST_VAR, file.api_host)?,
        api_key: pick(KEY_VAR, file.api_key)?,
    })
}

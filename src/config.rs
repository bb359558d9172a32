//! Configuration file support
//!
//! Reads `.gitlab_depcheck.toml` from the current directory, falling back to
//! the home directory:
//!
//! ```toml
//! [gitlab]
//! url = "https://gitlab.com"
//! token = "your-token-here"
//!
//! [search]
//! group = "mycompany"
//! max_concurrent = 20
//! ```
//!
//! Command-line flags and the `GITLAB_TOKEN` environment variable take
//! precedence over config values; that resolution happens in `main`.

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Config file name, looked up in cwd and then the home directory.
pub const CONFIG_FILE_NAME: &str = ".gitlab_depcheck.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// `[gitlab]` section: where and how to connect.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GitLabSection {
    pub url: Option<String>,
    pub token: Option<String>,
}

/// `[search]` section: default scan scope and concurrency.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SearchSection {
    pub group: Option<String>,
    pub max_concurrent: Option<usize>,
}

/// Top-level configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gitlab: GitLabSection,
    #[serde(default)]
    pub search: SearchSection,
}

impl Config {
    /// Load configuration from the first config file found, or defaults if
    /// none exists. A file that exists but cannot be read or parsed is an
    /// error rather than silently ignored.
    pub fn load() -> Result<Self, ConfigError> {
        let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(CONFIG_FILE_NAME));
        }

        for path in candidates {
            if !path.exists() {
                continue;
            }
            let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            return toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source });
        }

        Ok(Config::default())
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pipeline::Strategy;
use crate::{rlog_debug, Error, Result};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BASE_URL: &str = "https://adventofcode.com";
pub const DEFAULT_COMMAND: &str = "claude --dangerously-skip-permissions";
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 600;

/// Environment variable holding the default puzzle-site session token.
pub const SESSION_ENV: &str = "AOC_SESSION";

/// Service configuration read from `~/.aoc-race/config.toml`.
///
/// Every field is optional; accessors fall back to the defaults above.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub workspace_dir: Option<String>,
    pub command: Option<String>,
    pub stage_timeout_secs: Option<u64>,
    pub base_url: Option<String>,
    pub strategy: Option<Strategy>,
}

impl Config {
    pub fn race_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".aoc-race"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::race_dir()?.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        rlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            rlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        rlog_debug!(
            "Config loaded: host={:?}, port={:?}, workspace_dir={:?}, strategy={:?}",
            config.host,
            config.port,
            config.workspace_dir,
            config.strategy
        );
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn effective_command(&self) -> &str {
        self.command.as_deref().unwrap_or(DEFAULT_COMMAND)
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs.unwrap_or(DEFAULT_STAGE_TIMEOUT_SECS))
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy.unwrap_or_default()
    }

    pub fn workspace_dir(&self) -> Result<PathBuf> {
        match &self.workspace_dir {
            Some(dir) => Ok(expand_tilde(dir)),
            None => Ok(Self::race_dir()?.join("workspace")),
        }
    }

    /// Session token from the environment, ignoring blank values.
    pub fn env_session() -> Option<String> {
        std::env::var(SESSION_ENV)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

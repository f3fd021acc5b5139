//! Daemon settings
//!
//! Layered with the `config` crate: built-in defaults, then the TOML file named
//! by `JOBWATCH_CONFIG` (default `~/.jobwatch/config.toml`, optional), then
//! `JOBWATCH_*` environment variables with `__` between nested keys
//! (`JOBWATCH_RPC__PORT=9600`).
//!
//! ```toml
//! store_path = "~/.jobwatch/jobs.csv"
//! delta_path = "~/.jobwatch/new_jobs.csv"
//!
//! [schedule]
//! interval_minutes = 360
//! run_on_start = true
//!
//! [[sources]]
//! name = "amazon"
//! command = "node"
//! args = ["scrapers/amazon.js"]
//! timeout_secs = 300
//! ```

use config::{Config, ConfigError, Environment, File};
use jobwatch_api_rpc::server::{DEFAULT_RPC_HOST, DEFAULT_RPC_PORT};
use jobwatch_api_rpc::RpcServerConfig;
use jobwatch_core::application::constants::{DEFAULT_CYCLE_INTERVAL, DEFAULT_SOURCE_TIMEOUT_SECS};
use jobwatch_core::error::AppError;
use jobwatch_infra_system::{CommandSpec, DEFAULT_ENV_ALLOWLIST};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "~/.jobwatch/config.toml";
const DEFAULT_STORE_PATH: &str = "~/.jobwatch/jobs.csv";
const DEFAULT_DELTA_PATH: &str = "~/.jobwatch/new_jobs.csv";
const ENV_PREFIX: &str = "JOBWATCH";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub store_path: String,
    pub delta_path: String,
    pub rpc: RpcSettings,
    pub schedule: ScheduleSettings,
    /// Daily-rotated log files are written here when set
    #[serde(default)]
    pub log_dir: Option<String>,
    /// Daemon variables a scraper may inherit
    pub env_allowlist: Vec<String>,
    #[serde(default)]
    pub sources: Vec<SourceSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSettings {
    pub interval_minutes: u64,
    pub run_on_start: bool,
}

/// One external scraper
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSettings {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub working_dir: Option<String>,
}

fn default_source_timeout() -> u64 {
    DEFAULT_SOURCE_TIMEOUT_SECS
}

impl Settings {
    /// Load from the configured file (if present) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(format!("{}_CONFIG", ENV_PREFIX))
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&expand(&path))
    }

    /// Load with `path` as the config file. A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let allowlist: Vec<String> = DEFAULT_ENV_ALLOWLIST.iter().map(|s| s.to_string()).collect();

        Config::builder()
            .set_default("store_path", DEFAULT_STORE_PATH)?
            .set_default("delta_path", DEFAULT_DELTA_PATH)?
            .set_default("rpc.host", DEFAULT_RPC_HOST)?
            .set_default("rpc.port", i64::from(DEFAULT_RPC_PORT))?
            .set_default(
                "schedule.interval_minutes",
                (DEFAULT_CYCLE_INTERVAL.as_secs() / 60) as i64,
            )?
            .set_default("schedule.run_on_start", true)?
            .set_default("env_allowlist", allowlist)?
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Reject settings the daemon cannot run with
    pub fn validate(&self) -> Result<(), AppError> {
        if self.store_path.trim().is_empty() {
            return Err(AppError::Config("store_path must not be empty".to_string()));
        }
        if self.delta_path.trim().is_empty() {
            return Err(AppError::Config("delta_path must not be empty".to_string()));
        }
        if self.store_path() == self.delta_path() {
            return Err(AppError::Config(
                "store_path and delta_path must be different files".to_string(),
            ));
        }
        if self.schedule.interval_minutes == 0 {
            return Err(AppError::Config(
                "schedule.interval_minutes must be positive".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(AppError::Config("source name must not be empty".to_string()));
            }
            if !names.insert(source.name.as_str()) {
                return Err(AppError::Config(format!(
                    "duplicate source name: {}",
                    source.name
                )));
            }
            if source.command.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "source {} has an empty command",
                    source.name
                )));
            }
            if source.timeout_secs == 0 {
                return Err(AppError::Config(format!(
                    "source {} needs a positive timeout_secs",
                    source.name
                )));
            }
        }
        Ok(())
    }

    pub fn store_path(&self) -> PathBuf {
        expand(&self.store_path)
    }

    pub fn delta_path(&self) -> PathBuf {
        expand(&self.delta_path)
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.log_dir.as_deref().map(expand)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.schedule.interval_minutes * 60)
    }

    pub fn rpc_config(&self) -> RpcServerConfig {
        RpcServerConfig {
            host: self.rpc.host.clone(),
            port: self.rpc.port,
        }
    }
}

impl SourceSettings {
    pub fn to_spec(&self) -> CommandSpec {
        CommandSpec {
            name: self.name.clone(),
            command: self.command.clone(),
            args: self.args.clone(),
            env: self.env.clone(),
            working_dir: self.working_dir.as_deref().map(expand),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

//! Daemon settings
//!
//! Layering (later wins): built-in defaults, optional TOML file, then
//! `OFFLINE_QUEUE_*` environment variables (`__` separates nested keys, e.g.
//! `OFFLINE_QUEUE_STORAGE__BACKEND=file`).

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "OFFLINE_QUEUE";
pub const CONFIG_PATH_ENV: &str = "OFFLINE_QUEUE_CONFIG";

/// Used when no platform data directory can be determined
const FALLBACK_DATA_DIR: &str = "~/.offline-queue";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    /// TCP probe against `network.probe_target`
    Probe,
    /// Toggled from the console with `online` / `offline`
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// SQLite file, or snapshot directory for the file backend
    pub path: Option<String>,
    pub snapshot_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherSettings {
    pub submit_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkSettings {
    pub mode: NetworkMode,
    pub probe_target: String,
    pub probe_interval_ms: u64,
    pub probe_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSettings {
    pub base_url: String,
    pub bounty_path: String,
    pub message_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub storage: StorageSettings,
    pub dispatcher: DispatcherSettings,
    pub network: NetworkSettings,
    pub remote: RemoteSettings,
    pub log_format: LogFormat,
}

impl Settings {
    /// Load from defaults, `file` (if any) and the process environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::build(file, None)
    }

    /// Config file named by `--config <path>` or `OFFLINE_QUEUE_CONFIG`
    pub fn config_path_from_args(args: &[String]) -> Option<PathBuf> {
        args.windows(2)
            .find(|pair| pair[0] == "--config")
            .map(|pair| PathBuf::from(&pair[1]))
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
    }

    /// `env` replaces the process environment when given (tests)
    fn build(file: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("storage.backend", "sqlite")?
            .set_default("storage.snapshot_key", "offline_queue")?
            .set_default("dispatcher.submit_timeout_ms", 30_000)?
            .set_default("network.mode", "probe")?
            .set_default("network.probe_target", "1.1.1.1:443")?
            .set_default("network.probe_interval_ms", 5_000)?
            .set_default("network.probe_timeout_ms", 2_000)?
            .set_default("remote.base_url", "http://localhost:8080/api")?
            .set_default("remote.bounty_path", "bounties")?
            .set_default("remote.message_path", "messages")?
            .set_default("log_format", "pretty")?;

        if let Some(path) = file {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let settings: Settings = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.dispatcher.submit_timeout_ms == 0 {
            bail!("dispatcher.submit_timeout_ms must be greater than 0");
        }
        if self.network.probe_interval_ms == 0 || self.network.probe_timeout_ms == 0 {
            bail!("network.probe_interval_ms and network.probe_timeout_ms must be greater than 0");
        }
        if self.storage.snapshot_key.trim().is_empty() {
            bail!("storage.snapshot_key must not be empty");
        }
        Ok(())
    }

    /// Storage location with `~` expanded
    ///
    /// Defaults to `<data dir>/queue.db` for SQLite and `<data dir>/snapshots`
    /// for the file backend.
    pub fn storage_path(&self) -> PathBuf {
        match &self.storage.path {
            Some(path) => PathBuf::from(shellexpand::tilde(path).into_owned()),
            None => {
                let data_dir = default_data_dir();
                match self.storage.backend {
                    StorageBackend::Sqlite => data_dir.join("queue.db"),
                    StorageBackend::File => data_dir.join("snapshots"),
                }
            }
        }
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatcher.submit_timeout_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.network.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.network.probe_timeout_ms)
    }
}

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("dev", "offline-queue", "offline-queue")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(shellexpand::tilde(FALLBACK_DATA_DIR).into_owned()))
}

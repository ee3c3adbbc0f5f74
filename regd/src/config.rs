//! Daemon configuration, loaded from TOML and live-reloaded on file change, mirroring the
//! teacher's `Config`/`ConfigManager` split: a plain `Deserialize` struct for the file shape,
//! and a `RwLock`-guarded manager that keeps a `notify` watcher alive alongside it.

use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, RwLock};
use std::thread;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Full daemon configuration, loaded from TOML.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RegdConfig {
    /// Filesystem path for the KCONT control socket.
    #[serde(default = "default_kcont_socket")]
    pub kcont_socket: PathBuf,
    /// Filesystem path for the VARS control socket.
    #[serde(default = "default_vars_socket")]
    pub vars_socket: PathBuf,
    /// Number of hash buckets backing the KCONT registry.
    #[serde(default = "default_kcont_buckets")]
    pub kcont_buckets: usize,
    /// Default storage size for a VARS variable whose descriptor omits `capacity`.
    #[serde(default = "default_var_capacity")]
    pub vars_default_capacity: u32,
    /// Directory the daemon's log file is written under.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Minimum level of log record that reaches the log file/stderr.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_kcont_socket() -> PathBuf {
    PathBuf::from(shared::constants::DEFAULT_KCONT_SOCKET)
}
fn default_vars_socket() -> PathBuf {
    PathBuf::from(shared::constants::DEFAULT_VARS_SOCKET)
}
fn default_kcont_buckets() -> usize {
    shared::constants::DEFAULT_KCONT_BUCKETS
}
fn default_var_capacity() -> u32 {
    shared::constants::DEFAULT_VAR_CAPACITY
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/regd")
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RegdConfig {
    fn default() -> Self {
        Self {
            kcont_socket: default_kcont_socket(),
            vars_socket: default_vars_socket(),
            kcont_buckets: default_kcont_buckets(),
            vars_default_capacity: default_var_capacity(),
            log_dir: default_log_dir(),
            log_level: default_log_level(),
        }
    }
}

impl RegdConfig {
    /// Load, parse, and validate a `RegdConfig` from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|e| ConfigError::Io { path: path.to_path_buf(), source: e })?;
        let cfg: RegdConfig = toml::from_str(&s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.kcont_buckets == 0 {
            return Err(ConfigError::Validation("kcont_buckets must be > 0".into()));
        }
        if !self.kcont_buckets.is_power_of_two() {
            return Err(ConfigError::Validation("kcont_buckets must be a power of two".into()));
        }
        if self.vars_default_capacity == 0 {
            return Err(ConfigError::Validation("vars_default_capacity must be > 0".into()));
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn from_str(toml: &str) -> Result<Self, ConfigError> {
        let cfg: RegdConfig = toml::from_str(toml)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Manages a live-updating `RegdConfig` via file-watcher. Socket paths and bucket counts only
/// take effect on the next daemon restart; `log_level` and `vars_default_capacity` are read
/// fresh from [`ConfigManager::get`] on every relevant operation.
pub struct ConfigManager {
    inner: Arc<RwLock<RegdConfig>>,
    _watcher: RecommendedWatcher,
}

impl ConfigManager {
    pub fn new(path: &Path) -> Result<Self, ConfigError> {
        let cfg = RegdConfig::load(path)?;
        let shared_cfg = Arc::new(RwLock::new(cfg));
        let (tx, rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            tx,
            notify::Config::default().with_poll_interval(std::time::Duration::from_secs(1)),
        )
        .map_err(|e| ConfigError::Validation(format!("watcher error: {e}")))?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::Validation(format!("watch error: {e}")))?;

        let cfg_path = path.to_path_buf();
        let shared_clone = Arc::clone(&shared_cfg);
        thread::Builder::new()
            .name("config-watcher".to_string())
            .spawn(move || {
                for evt in rx {
                    let Ok(event) = evt else { continue };
                    if let EventKind::Modify(_) = event.kind {
                        match RegdConfig::load(&cfg_path) {
                            Ok(new_cfg) => {
                                *shared_clone.write().unwrap() = new_cfg;
                                log::info!("config reloaded from {}", cfg_path.display());
                            }
                            Err(e) => log::error!("failed to reload config: {e}"),
                        }
                    }
                }
            })
            .expect("failed to spawn config-watcher thread");

        Ok(ConfigManager { inner: shared_cfg, _watcher: watcher })
    }

    pub fn get(&self) -> RegdConfig {
        self.inner.read().unwrap().clone()
    }
}

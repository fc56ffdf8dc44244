//! Node configuration for the Locker host.
//!
//! Provides [`NodeConfig`] with defaults for the data directory, RPC binding,
//! logging, and the fee schedule. [`NodeConfig::from_env`] overrides fields
//! from `LOCKER_*` environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use locker_core::error::ConfigError;
use locker_core::fees::FeeSchedule;

/// Default JSON-RPC port.
pub const DEFAULT_RPC_PORT: u16 = 28_640;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidValue {
                key: "log_format".into(),
                value: other.into(),
            }),
        }
    }
}

/// Configuration for a node instance.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Root directory for all persistent data.
    pub data_dir: PathBuf,
    /// IP address for the JSON-RPC server to bind to.
    pub rpc_bind: String,
    /// Port for the JSON-RPC server.
    pub rpc_port: u16,
    /// Log level filter string (e.g. "info", "debug", "locker_node_lib=trace").
    pub log_level: String,
    pub log_format: LogFormat,
    /// Fees and thresholds applied by every hosted vault.
    pub fees: FeeSchedule,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("locker");

        Self {
            data_dir,
            rpc_bind: "127.0.0.1".to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            fees: FeeSchedule::default(),
        }
    }
}

impl NodeConfig {
    /// Path to the RocksDB data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("lockerdata")
    }

    /// Socket address string for the RPC server.
    pub fn rpc_addr(&self) -> String {
        format!("{}:{}", self.rpc_bind, self.rpc_port)
    }

    /// Defaults overridden by `LOCKER_DATA_DIR`, `LOCKER_RPC_BIND`,
    /// `LOCKER_RPC_PORT`, `LOCKER_LOG_LEVEL` and `LOCKER_LOG_FORMAT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(dir) = lookup("LOCKER_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Some(bind) = lookup("LOCKER_RPC_BIND") {
            cfg.rpc_bind = bind;
        }
        if let Some(port) = lookup("LOCKER_RPC_PORT") {
            cfg.rpc_port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "LOCKER_RPC_PORT".into(),
                value: port.clone(),
            })?;
        }
        if let Some(level) = lookup("LOCKER_LOG_LEVEL") {
            cfg.log_level = level;
        }
        if let Some(format) = lookup("LOCKER_LOG_FORMAT") {
            cfg.log_format = format.parse()?;
        }

        cfg.fees.validate()?;
        Ok(cfg)
    }
}

//! Daemon configuration, loaded from TOML with per-field defaults.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use ideas_ledger::DEFAULT_EVENT_RETENTION;
use ideas_types::Address;
use ideas_utils::LogFormat;
use serde::{Deserialize, Serialize};

use crate::error::DaemonError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Account holding the administrator role. Required.
    #[serde(default)]
    pub administrator: Option<Address>,

    /// Directory holding the ledger snapshot and content bodies.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Interface both servers bind to.
    #[serde(default = "default_bind_host")]
    pub bind_host: IpAddr,

    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    #[serde(default)]
    pub enable_websocket: bool,

    #[serde(default = "default_ws_port")]
    pub websocket_port: u16,

    /// Number of recent events kept for replay.
    #[serde(default = "default_event_retention")]
    pub event_retention: usize,

    /// Seconds between snapshot saves; 0 saves only on shutdown.
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_secs: u64,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub enable_cors: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./ideas_data")
}

fn default_bind_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_rpc_port() -> u16 {
    7077
}

fn default_ws_port() -> u16 {
    7078
}

fn default_event_retention() -> usize {
    DEFAULT_EVENT_RETENTION
}

fn default_snapshot_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl DaemonConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, DaemonError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DaemonError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, DaemonError> {
        toml::from_str(s).map_err(|e| DaemonError::Config(e.to_string()))
    }

    /// Check the settings and return the administrator, which must be a
    /// non-zero address.
    pub fn validate(&self) -> Result<Address, DaemonError> {
        if self.event_retention == 0 {
            return Err(DaemonError::Config(
                "event_retention must be at least 1".into(),
            ));
        }
        match &self.administrator {
            None => Err(DaemonError::Config("administrator is required".into())),
            Some(admin) if admin.is_zero() => Err(DaemonError::Config(
                "administrator must not be the zero address".into(),
            )),
            Some(admin) => Ok(admin.clone()),
        }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("ledger.snapshot")
    }

    pub fn content_dir(&self) -> PathBuf {
        self.data_dir.join("content")
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            administrator: None,
            data_dir: default_data_dir(),
            bind_host: default_bind_host(),
            rpc_port: default_rpc_port(),
            enable_websocket: false,
            websocket_port: default_ws_port(),
            event_retention: default_event_retention(),
            snapshot_interval_secs: default_snapshot_interval(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            enable_cors: false,
        }
    }
}

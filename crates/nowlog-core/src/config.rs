//! Configuration system for nowlog.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $NOWLOG_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/nowlog/config.toml
//!   3. ~/.config/nowlog/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::peer::{InterfaceRole, LocalMasterKey, MacAddr, PeerDescriptor};
use crate::wire::DEFAULT_LINK_PORT;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NowlogConfig {
    pub radio: RadioConfig,
    pub storage: StorageConfig,
    /// Trusted peers, registered in this order at boot.
    pub peers: Vec<PeerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Local hardware address used on the link.
    pub local_address: String,
    /// Interface the radio runs in.
    pub mode: InterfaceRole,
    /// Operating channel. Peers on other channels are never heard.
    pub channel: u8,
    /// Interval between transport readiness checks.
    pub ready_poll_ms: u64,
    /// Give up waiting for the transport after this long. 0 = wait forever.
    pub ready_timeout_ms: u64,
    /// Delay before restarting the process after a fatal boot error.
    pub restart_delay_ms: u64,
    /// UDP port of the stand-in link.
    pub link_port: u16,
    /// Receive counters are logged this often. 0 = never.
    pub stats_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Where the storage medium is mounted. Missing = medium unavailable.
    pub mount_point: PathBuf,
    /// Name of the append-only log inside the medium.
    pub log_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    /// Hardware address, e.g. "1c:69:20:89:d9:08".
    pub address: String,
    /// Channel override. Defaults to the radio channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<u8>,
    #[serde(default)]
    pub interface: InterfaceRole,
    /// Optional 16-byte link key as 32 hex characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lmk: Option<String>,
}

impl PeerConfig {
    pub fn station(address: &str) -> Self {
        Self {
            address: address.to_string(),
            channel: None,
            interface: InterfaceRole::Station,
            lmk: None,
        }
    }
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NowlogConfig {
    fn default() -> Self {
        Self {
            radio: RadioConfig::default(),
            storage: StorageConfig::default(),
            peers: vec![
                PeerConfig::station("1c:69:20:89:d9:08"),
                PeerConfig::station("1c:69:20:89:e7:28"),
                PeerConfig::station("08:3a:f2:73:08:94"),
            ],
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            local_address: "02:00:00:00:00:01".to_string(),
            mode: InterfaceRole::Station,
            channel: 6,
            ready_poll_ms: 100,
            ready_timeout_ms: 10_000,
            restart_delay_ms: 5_000,
            link_port: DEFAULT_LINK_PORT,
            stats_interval_secs: 60,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mount_point: data_dir().join("sd"),
            log_name: "received_data.txt".to_string(),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("nowlog")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("nowlog")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid address {0:?}: {1}")]
    InvalidAddress(String, crate::peer::ParseMacError),
    #[error("peer {0}: link key must be 32 hex characters")]
    InvalidKey(String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl NowlogConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            NowlogConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a config file without applying env overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("NOWLOG_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&NowlogConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text)
                .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply NOWLOG_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("NOWLOG_RADIO__CHANNEL") {
            if let Ok(c) = v.parse() {
                self.radio.channel = c;
            }
        }
        if let Ok(v) = std::env::var("NOWLOG_RADIO__LINK_PORT") {
            if let Ok(p) = v.parse() {
                self.radio.link_port = p;
            }
        }
        if let Ok(v) = std::env::var("NOWLOG_STORAGE__MOUNT_POINT") {
            self.storage.mount_point = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("NOWLOG_STORAGE__LOG_NAME") {
            self.storage.log_name = v;
        }
    }

    /// The local hardware address.
    pub fn local_address(&self) -> Result<MacAddr, ConfigError> {
        self.radio
            .local_address
            .parse()
            .map_err(|e| ConfigError::InvalidAddress(self.radio.local_address.clone(), e))
    }

    /// Turn the configured peer list into descriptors, preserving order.
    ///
    /// Duplicates are kept; rejecting them is the registry's job.
    pub fn peer_descriptors(&self) -> Result<Vec<PeerDescriptor>, ConfigError> {
        self.peers
            .iter()
            .map(|p| {
                let address: MacAddr = p
                    .address
                    .parse()
                    .map_err(|e| ConfigError::InvalidAddress(p.address.clone(), e))?;
                let lmk = match &p.lmk {
                    Some(hex_key) => Some(
                        LocalMasterKey::from_hex(hex_key)
                            .ok_or_else(|| ConfigError::InvalidKey(p.address.clone()))?,
                    ),
                    None => None,
                };
                Ok(PeerDescriptor::new(
                    address,
                    p.channel.unwrap_or(self.radio.channel),
                    p.interface,
                    lmk,
                ))
            })
            .collect()
    }
}

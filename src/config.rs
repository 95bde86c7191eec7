//! Configuration for TallyKV
//!
//! Centralized configuration with sensible defaults. A server reads it once
//! at startup from a TOML file (see [`Config::from_file`]); embedders and
//! tests use [`Config::builder`]. The value is passed explicitly into
//! [`crate::Store::open`] and from there to the key discard scheduler.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};

/// Config file looked up when no `--config` flag is given
pub const DEFAULT_CONFIG_FILE: &str = "tallykv.toml";

/// Main configuration for a TallyKV instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Storage engine selector
    pub engine: EngineKind,

    /// Root directory for all data files (WAL, SSTables, etc.)
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log          (write-ahead log)
    ///     └── sstables/        (SSTable files)
    #[serde(rename = "data_path")]
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    #[serde(rename = "wal_sync")]
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Max size of memtable before flush (in bytes)
    pub memtable_size_limit: usize,

    // -------------------------------------------------------------------------
    // Key Discard Configuration
    // -------------------------------------------------------------------------
    /// How often the background reclamation runs
    #[serde(rename = "key_discard_interval_secs", with = "duration_secs")]
    pub key_discard_interval: Duration,

    /// Minimum discardable fraction before SSTables get rewritten
    pub key_discard_ratio: f64,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    #[serde(rename = "listen_address")]
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Logging Configuration
    // -------------------------------------------------------------------------
    /// Log decoration tokens, see [`LogFlags::parse`]
    pub log_flags: Vec<String>,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

/// Storage engine selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// WAL + SSTables under `data_dir`
    File,

    /// MemTable only, nothing touches disk
    Memory,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineKind::File,
            data_dir: PathBuf::from("./.data/dump"),
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            memtable_size_limit: 64 * 1024 * 1024, // 64 MB
            key_discard_interval: Duration::from_secs(90),
            key_discard_ratio: 0.7,
            listen_addr: "127.0.0.1:8962".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
            log_flags: vec!["default".to_string()],
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| TallyError::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TallyError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Check values that would otherwise fail later at runtime
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.trim().is_empty() {
            return Err(TallyError::Config("listen_address must not be empty".into()));
        }
        if self.engine == EngineKind::File && self.data_dir.as_os_str().is_empty() {
            return Err(TallyError::Config("data_path must not be empty".into()));
        }
        if self.key_discard_interval.is_zero() {
            return Err(TallyError::Config(
                "key_discard_interval_secs must be greater than zero".into(),
            ));
        }
        if !(self.key_discard_ratio > 0.0 && self.key_discard_ratio < 1.0) {
            return Err(TallyError::Config(format!(
                "key_discard_ratio must be in (0, 1), got {}",
                self.key_discard_ratio
            )));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(TallyError::Config("wal_sync count must be at least 1".into()));
        }
        if self.max_connections == 0 {
            return Err(TallyError::Config("max_connections must be at least 1".into()));
        }
        self.log_flags()?;
        Ok(())
    }

    /// Parsed log decoration flags
    pub fn log_flags(&self) -> Result<LogFlags> {
        LogFlags::parse(&self.log_flags)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Select the storage engine
    pub fn engine(mut self, engine: EngineKind) -> Self {
        self.config.engine = engine;
        self
    }

    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the memtable size limit (in bytes)
    pub fn memtable_size_limit(mut self, size: usize) -> Self {
        self.config.memtable_size_limit = size;
        self
    }

    /// Set the interval between background reclamation runs
    pub fn key_discard_interval(mut self, interval: Duration) -> Self {
        self.config.key_discard_interval = interval;
        self
    }

    /// Set the reclamation ratio threshold
    pub fn key_discard_ratio(mut self, ratio: f64) -> Self {
        self.config.key_discard_ratio = ratio;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the log decoration tokens
    pub fn log_flags<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.log_flags = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

// =============================================================================
// Log Flags
// =============================================================================

/// Decoration applied to every log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFlags {
    /// Prefix each line with an RFC 3339 UTC timestamp
    pub timestamps: bool,

    /// Prefix each line with the event target (module path)
    pub target: bool,
}

impl LogFlags {
    pub const TOKEN_DATE: &'static str = "date";
    pub const TOKEN_TIME: &'static str = "time";
    pub const TOKEN_UTC: &'static str = "utc";
    pub const TOKEN_MSGPREFIX: &'static str = "msgprefix";
    pub const TOKEN_DEFAULT: &'static str = "default";
    pub const TOKEN_NONE: &'static str = "none";

    /// Flags used when no token is configured
    pub const DEFAULT: LogFlags = LogFlags {
        timestamps: true,
        target: true,
    };

    /// Parse log flag tokens.
    ///
    /// An empty list means [`LogFlags::DEFAULT`]; a lone `none` turns all
    /// decoration off. `none` mixed with anything else is rejected, as is
    /// any unknown token. Blank tokens are skipped.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        if tokens.is_empty() {
            return Ok(Self::DEFAULT);
        }

        let mut flags = LogFlags {
            timestamps: false,
            target: false,
        };

        if tokens.len() == 1 && tokens[0].as_ref() == Self::TOKEN_NONE {
            return Ok(flags);
        }

        for token in tokens {
            match token.as_ref() {
                // Timestamps are always UTC
                Self::TOKEN_DATE | Self::TOKEN_TIME | Self::TOKEN_UTC => flags.timestamps = true,
                Self::TOKEN_MSGPREFIX => flags.target = true,
                Self::TOKEN_DEFAULT => {
                    flags.timestamps = true;
                    flags.target = true;
                }
                Self::TOKEN_NONE => {
                    return Err(TallyError::Config(format!(
                        "LogFlag '{}' cannot mix with other flag values",
                        Self::TOKEN_NONE
                    )));
                }
                "" => {}
                other => {
                    return Err(TallyError::Config(format!(
                        "unsupported LogFlag '{}'",
                        other
                    )));
                }
            }
        }

        Ok(flags)
    }
}

/// Serde adapter storing a `Duration` as whole seconds
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

//! Configuration types

use crate::{BlockMetaResult, ConfigError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// How redirected values are handed to multiple readers in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadPolicy {
    /// Every reader of a key gets the same stored value.
    #[default]
    Broadcast,
    /// Stored values form an ordered queue; each reader consumes the next one.
    /// Writes append per block instance so reads line up with save order.
    Queue,
}

impl ReadPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadPolicy::Broadcast => "broadcast",
            ReadPolicy::Queue => "queue",
        }
    }
}

impl fmt::Display for ReadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "broadcast" => Ok(ReadPolicy::Broadcast),
            "queue" => Ok(ReadPolicy::Queue),
            _ => Err(ConfigError::InvalidValue {
                field: "read_policy".to_string(),
                value: s.to_string(),
                reason: "expected broadcast or queue".to_string(),
            }),
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedirectConfig {
    /// Read consumption policy (and the matching write accumulation).
    pub read_policy: ReadPolicy,
    /// Skip flushing when the saved document is a revision snapshot.
    pub skip_revisions: bool,
    /// Write to the store even when nothing was accumulated in the pass.
    pub flush_when_empty: bool,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            read_policy: ReadPolicy::Broadcast,
            skip_revisions: true,
            flush_when_empty: false,
        }
    }
}

impl RedirectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_policy(mut self, policy: ReadPolicy) -> Self {
        self.read_policy = policy;
        self
    }

    pub fn with_skip_revisions(mut self, skip: bool) -> Self {
        self.skip_revisions = skip;
        self
    }

    pub fn with_flush_when_empty(mut self, enabled: bool) -> Self {
        self.flush_when_empty = enabled;
        self
    }

    /// Load configuration from environment variables over the defaults.
    ///
    /// Environment variables:
    /// - `BLOCKMETA_READ_POLICY`: "broadcast" or "queue" (default: broadcast)
    /// - `BLOCKMETA_SKIP_REVISIONS`: "true" or "false" (default: true)
    /// - `BLOCKMETA_FLUSH_WHEN_EMPTY`: "true" or "false" (default: false)
    pub fn from_env() -> BlockMetaResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`RedirectConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> BlockMetaResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("BLOCKMETA_READ_POLICY") {
            config.read_policy = raw.parse()?;
        }
        if let Some(raw) = lookup("BLOCKMETA_SKIP_REVISIONS") {
            config.skip_revisions = parse_bool("skip_revisions", &raw)?;
        }
        if let Some(raw) = lookup("BLOCKMETA_FLUSH_WHEN_EMPTY") {
            config.flush_when_empty = parse_bool("flush_when_empty", &raw)?;
        }

        Ok(config)
    }

    /// Parse configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> BlockMetaResult<Self> {
        let config: RedirectConfig = toml::from_str(source).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_path(path: &Path) -> BlockMetaResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }
}

fn parse_bool(field: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: raw.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

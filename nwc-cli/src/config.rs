// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{CliError, Result};

pub const DEFAULT_AUTH_RELAY: &str = "wss://relay.getalby.com/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        };
        f.write_str(s)
    }
}

fn deserialize_relays<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let relays: Vec<String> = Vec::deserialize(deserializer)?;
    for relay in &relays {
        nwc_core::validate_relay_url(relay).map_err(serde::de::Error::custom)?;
    }
    Ok(relays)
}

fn deserialize_timeout<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<u64>::deserialize(deserializer)?;
    if opt == Some(0) {
        return Err(serde::de::Error::custom("timeout must be greater than 0"));
    }
    Ok(opt)
}

fn deserialize_uri<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    match opt {
        Some(uri) if uri.starts_with('~') || uri.starts_with('/') => {
            let path = PathBuf::from(shellexpand::tilde(&uri).as_ref());
            std::fs::read_to_string(&path)
                .map(|s| Some(s.trim().to_string()))
                .map_err(|e| {
                    serde::de::Error::custom(format!(
                        "failed to read connection_uri from {}: {e}",
                        path.display()
                    ))
                })
        }
        other => Ok(other),
    }
}

/// `~/.config/nwc/config.toml`.
///
/// `connection_uri` is either the URI itself or a path to a file holding it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, deserialize_with = "deserialize_uri")]
    pub connection_uri: Option<String>,
    #[serde(default, deserialize_with = "deserialize_relays")]
    pub relays: Vec<String>,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default, deserialize_with = "deserialize_timeout")]
    pub timeout: Option<u64>,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => return Self::from_file(path),
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        const MAX_CONFIG_SIZE: u64 = 1024 * 1024;
        let metadata = std::fs::metadata(path)?;
        if metadata.len() > MAX_CONFIG_SIZE {
            return Err(CliError::Config("config file too large".into()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CliError::Config(e.to_string()))
    }

    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("nwc").join("config.toml"))
            .ok_or(CliError::HomeNotFound)
    }

    /// The flag (or `NWC_URI`) wins over the config file.
    pub fn connection_uri(&self, flag: Option<&str>) -> Result<String> {
        flag.map(str::to_string)
            .or_else(|| self.connection_uri.clone())
            .ok_or_else(|| {
                CliError::Usage(
                    "no wallet connection: pass --uri, set NWC_URI or connection_uri in the config"
                        .into(),
                )
            })
    }

    /// Relays from flags, else from the config. Empty means "use the URI's".
    pub fn relay_override(&self, flags: &[String]) -> Vec<String> {
        if flags.is_empty() {
            self.relays.clone()
        } else {
            flags.to_vec()
        }
    }

    pub fn default_relay(&self) -> &str {
        self.relays
            .first()
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_AUTH_RELAY)
    }

    pub fn reply_timeout(&self, flag: Option<u64>) -> Option<Duration> {
        flag.or(self.timeout).map(Duration::from_secs)
    }
}

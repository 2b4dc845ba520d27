// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup by [`Config::from_env`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the database file | `./data` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `SHUTDOWN_TIMEOUT_SECS` | Grace window for in-flight requests on shutdown | `2` |

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory path.
///
/// The database file [`DATABASE_FILE`] is created inside it on first start.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const SHUTDOWN_TIMEOUT_ENV: &str = "SHUTDOWN_TIMEOUT_SECS";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 2;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

pub const DATABASE_FILE: &str = "weather.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(name: &'static str, value: &str, reason: impl ToString) -> Self {
        ConfigError::Invalid {
            name,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub data_dir: PathBuf,
    pub log_format: LogFormat,
    pub shutdown_timeout: Duration,
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Read and validate configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = match var(HOST_ENV) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid(HOST_ENV, &raw, e))?,
            None => IpAddr::from([0, 0, 0, 0]),
        };

        let port = match var(PORT_ENV) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid(PORT_ENV, &raw, e))?,
            None => DEFAULT_PORT,
        };

        let data_dir = var(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let log_format = match var(LOG_FORMAT_ENV) {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => {
                    return Err(ConfigError::invalid(
                        LOG_FORMAT_ENV,
                        &raw,
                        "expected `json` or `pretty`",
                    ))
                }
            },
            None => LogFormat::default(),
        };

        let shutdown_timeout = match var(SHUTDOWN_TIMEOUT_ENV) {
            Some(raw) => Duration::from_secs(
                raw.trim()
                    .parse()
                    .map_err(|e| ConfigError::invalid(SHUTDOWN_TIMEOUT_ENV, &raw, e))?,
            ),
            None => Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        };

        Ok(Self {
            host,
            port,
            data_dir,
            log_format,
            shutdown_timeout,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

//! Configuration Module
//!
//! Handles loading cache and host configuration from environment variables.

use std::env;
use std::path::PathBuf;

use crate::error::{CacheError, Result};
use crate::store::Credentials;

/// Cache and host configuration parameters.
#[derive(Debug, Clone)]
pub struct Config {
    /// Connection string; takes precedence over account name + key
    pub connection_string: Option<String>,
    pub account_name: Option<String>,
    pub account_key: Option<String>,
    /// Backing table, created on first use if absent
    pub table_name: String,
    /// Partition shared by every entry of this cache instance
    pub partition_key: String,
    /// Root directory of the local table service
    pub data_dir: PathBuf,
    /// HTTP server port
    pub server_port: u16,
}

fn non_blank(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CONNECTION_STRING` - Table service connection string
    /// - `CACHE_ACCOUNT_NAME` / `CACHE_ACCOUNT_KEY` - Account credentials
    /// - `CACHE_TABLE_NAME` - Table name (default: cache)
    /// - `CACHE_PARTITION_KEY` - Partition key (default: default)
    /// - `CACHE_DATA_DIR` - Local table storage root (default: ./data)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            connection_string: non_blank("CACHE_CONNECTION_STRING"),
            account_name: non_blank("CACHE_ACCOUNT_NAME"),
            account_key: non_blank("CACHE_ACCOUNT_KEY"),
            table_name: non_blank("CACHE_TABLE_NAME").unwrap_or(defaults.table_name),
            partition_key: non_blank("CACHE_PARTITION_KEY").unwrap_or(defaults.partition_key),
            data_dir: non_blank("CACHE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
        }
    }

    /// Picks the credential form this configuration describes.
    ///
    /// # Errors
    /// `CacheError::Configuration` when neither a connection string nor a
    /// complete account name + key pair is present.
    pub fn credentials(&self) -> Result<Credentials> {
        if let Some(connection_string) = &self.connection_string {
            return Ok(Credentials::connection_string(connection_string.clone()));
        }

        match (&self.account_name, &self.account_key) {
            (Some(name), Some(key)) => Ok(Credentials::account_key(name.clone(), key.clone())),
            (Some(_), None) => Err(CacheError::Configuration(
                "CACHE_ACCOUNT_KEY must be set alongside CACHE_ACCOUNT_NAME".to_string(),
            )),
            (None, Some(_)) => Err(CacheError::Configuration(
                "CACHE_ACCOUNT_NAME must be set alongside CACHE_ACCOUNT_KEY".to_string(),
            )),
            (None, None) => Err(CacheError::Configuration(
                "either CACHE_CONNECTION_STRING or CACHE_ACCOUNT_NAME and CACHE_ACCOUNT_KEY must be set"
                    .to_string(),
            )),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection_string: None,
            account_name: None,
            account_key: None,
            table_name: "cache".to_string(),
            partition_key: "default".to_string(),
            data_dir: PathBuf::from("./data"),
            server_port: 3000,
        }
    }
}

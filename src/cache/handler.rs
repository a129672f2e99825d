//! Cache Handler Module
//!
//! Public get/set/refresh/remove surface over the table store adapter.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::cache::{policy, CacheEntry, EntryOptions};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::store::{ConnectionState, Credentials, TableConnector, TableStoreAdapter};

// == Distributed Cache ==
/// Byte-blob cache keyed by string identifiers.
#[async_trait]
pub trait DistributedCache: Send + Sync {
    /// Returns the stored value, or `None` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous entry wholesale.
    async fn set(&self, key: &str, value: Vec<u8>, options: &EntryOptions) -> Result<()>;

    /// Examines the entry and removes it if it has expired.
    async fn refresh(&self, key: &str) -> Result<()>;

    /// Removes the entry. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Stores `value` with no expiration.
    async fn set_default(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.set(key, value, &EntryOptions::default()).await
    }

    /// Stores a UTF-8 string.
    async fn set_string(&self, key: &str, value: &str, options: &EntryOptions) -> Result<()> {
        self.set(key, value.as_bytes().to_vec(), options).await
    }

    /// Reads a value back as a UTF-8 string.
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.get(key).await? {
            Some(bytes) => String::from_utf8(bytes).map(Some).map_err(|_| {
                CacheError::InvalidRequest(format!("value for key '{}' is not valid UTF-8", key))
            }),
            None => Ok(None),
        }
    }
}

// == Table Storage Cache ==
/// Distributed cache backed by one partition of a remote table.
///
/// Only `set` writes `last_access_time`; reads and refreshes leave the
/// sliding window where the last write put it.
pub struct TableStorageCache {
    adapter: TableStoreAdapter,
}

impl TableStorageCache {
    // == Constructor ==
    /// Creates a cache handler. No connection is made until first use.
    ///
    /// # Errors
    /// `CacheError::Configuration` when any argument is blank or malformed.
    pub fn new(
        connector: Arc<dyn TableConnector>,
        credentials: Credentials,
        table_name: impl Into<String>,
        partition_key: impl Into<String>,
    ) -> Result<Self> {
        let adapter = TableStoreAdapter::new(connector, credentials, table_name, partition_key)?;
        Ok(Self { adapter })
    }

    /// Creates a cache handler from loaded configuration.
    pub fn from_config(connector: Arc<dyn TableConnector>, config: &Config) -> Result<Self> {
        Self::new(
            connector,
            config.credentials()?,
            config.table_name.clone(),
            config.partition_key.clone(),
        )
    }

    /// Connects eagerly. Every operation does this implicitly.
    pub async fn connect(&self) -> Result<()> {
        self.adapter.connect().await.map(|_| ())
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.adapter.connection_state()
    }

    pub fn table_name(&self) -> &str {
        self.adapter.table_name()
    }

    pub fn partition_key(&self) -> &str {
        self.adapter.partition_key()
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    Ok(())
}

#[async_trait]
impl DistributedCache for TableStorageCache {
    // == Get ==
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let entry = self.adapter.get_entry(key).await?;
        Ok(entry.map(|entry| entry.value))
    }

    // == Set ==
    async fn set(&self, key: &str, value: Vec<u8>, options: &EntryOptions) -> Result<()> {
        validate_key(key)?;

        // Options are checked before any I/O so a rejected set writes nothing
        let now = Utc::now();
        let absolute_expiration = policy::compute_absolute_expiration(now, options)?;

        let entry = CacheEntry {
            partition: self.adapter.partition_key().to_string(),
            key: key.to_string(),
            value,
            sliding_expiration: options.sliding_expiration,
            absolute_expiration,
            last_access_time: Some(now),
        };

        self.adapter.upsert_entry(&entry).await
    }

    // == Refresh ==
    async fn refresh(&self, key: &str) -> Result<()> {
        validate_key(key)?;

        let Some(entry) = self.adapter.get_entry(key).await? else {
            return Ok(());
        };

        let now = Utc::now();
        if policy::is_expired(&entry, now) {
            self.adapter.delete_entry(key).await?;
            debug!(
                "Removed expired entry '{}' (idle {:?})",
                key,
                entry.idle_time(now)
            );
        }

        Ok(())
    }

    // == Remove ==
    async fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.adapter.delete_entry(key).await?;
        Ok(())
    }
}

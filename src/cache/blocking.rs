//! Blocking Cache Module
//!
//! Synchronous facade over [`TableStorageCache`] for callers without an
//! async runtime.

use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use crate::cache::{DistributedCache, EntryOptions, TableStorageCache};
use crate::error::{CacheError, Result};
use crate::store::{ConnectionState, Credentials, TableConnector};

// == Blocking Table Cache ==
/// Blocking counterpart of [`TableStorageCache`].
///
/// Owns a current-thread runtime and blocks on it for every call, so it must
/// not be used from inside another async runtime.
pub struct BlockingTableCache {
    inner: TableStorageCache,
    runtime: Runtime,
}

impl BlockingTableCache {
    pub fn new(
        connector: Arc<dyn TableConnector>,
        credentials: Credentials,
        table_name: impl Into<String>,
        partition_key: impl Into<String>,
    ) -> Result<Self> {
        let inner = TableStorageCache::new(connector, credentials, table_name, partition_key)?;
        Self::from_async(inner)
    }

    /// Wraps an existing async handler.
    pub fn from_async(inner: TableStorageCache) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(runtime_error)?;

        Ok(Self { inner, runtime })
    }

    pub fn connect(&self) -> Result<()> {
        self.runtime.block_on(self.inner.connect())
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.connection_state()
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.runtime.block_on(self.inner.get(key))
    }

    pub fn set(&self, key: &str, value: Vec<u8>, options: &EntryOptions) -> Result<()> {
        self.runtime.block_on(self.inner.set(key, value, options))
    }

    pub fn refresh(&self, key: &str) -> Result<()> {
        self.runtime.block_on(self.inner.refresh(key))
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.runtime.block_on(self.inner.remove(key))
    }
}

/// Runtime startup fails locally, so it is not a retryable store error.
fn runtime_error(error: std::io::Error) -> CacheError {
    CacheError::Configuration(format!("Failed to start runtime: {}", error))
}

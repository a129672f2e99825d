//! Table Store Module
//!
//! Abstract partitioned key-value table service, the adapter that connects
//! to it lazily, and the bundled backends.

mod adapter;
mod credentials;
mod memory;
mod sled_store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

// Re-export public types
pub use adapter::{ConnectionState, TableStoreAdapter};
pub use credentials::{
    Credentials, StorageAccount, DEVELOPMENT_ACCOUNT_KEY, DEVELOPMENT_ACCOUNT_NAME,
};
pub use memory::MemoryTableConnector;
pub use sled_store::SledTableConnector;

// == Table Row ==
/// A single row as persisted by the table service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub partition_key: String,
    pub row_key: String,
    pub data: Vec<u8>,
    /// Sliding window, stored as whole seconds plus nanoseconds
    #[serde(default)]
    pub sliding_expiration: Option<Duration>,
    #[serde(default)]
    pub absolute_expiration: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_access_time: Option<DateTime<Utc>>,
}

// == Ports ==
/// Builds clients for a table service from resolved account credentials.
#[async_trait]
pub trait TableConnector: Send + Sync + 'static {
    async fn connect(&self, account: &StorageAccount) -> Result<Arc<dyn TableClient>>;
}

/// An authenticated handle to a table service.
#[async_trait]
pub trait TableClient: Send + Sync + 'static {
    /// Resolves the named table, creating it if absent.
    async fn create_table_if_not_exists(&self, name: &str) -> Result<Arc<dyn Table>>;
}

/// Point operations against one table.
#[async_trait]
pub trait Table: Send + Sync + 'static {
    async fn retrieve(&self, partition_key: &str, row_key: &str) -> Result<Option<TableRow>>;

    /// Insert-or-replace; atomic at the row level.
    async fn insert_or_replace(&self, row: TableRow) -> Result<()>;

    /// Returns whether a row was removed.
    async fn delete(&self, partition_key: &str, row_key: &str) -> Result<bool>;
}

/// Validates a table name the way table services commonly do: 3-63
/// alphanumeric characters, starting with a letter.
pub fn validate_table_name(name: &str) -> Result<()> {
    let valid = (3..=63).contains(&name.len())
        && name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric());

    if valid {
        Ok(())
    } else {
        Err(crate::error::CacheError::Configuration(format!(
            "invalid table name '{}': expected 3-63 alphanumeric characters starting with a letter",
            name
        )))
    }
}

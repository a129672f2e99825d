//! Table Store Adapter
//!
//! Byte-level persistence for cache entries over a lazily connected table.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{
    validate_table_name, Credentials, StorageAccount, Table, TableClient, TableConnector, TableRow,
};
use crate::cache::CacheEntry;
use crate::error::{CacheError, Result};

// == Connection State ==
/// Lifecycle of the adapter's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No table handle yet; the next operation will connect
    Unconnected,
    /// A caller is constructing the client or provisioning the table
    Connecting,
    /// Table handle resolved; connecting is a no-op from here on
    Connected,
}

// == Table Store Adapter ==
/// Lazily connecting wrapper around one table and one partition.
///
/// Client construction and table provisioning each happen at most once
/// successfully, no matter how many callers race on first use. A failed
/// attempt leaves the adapter unconnected and the next caller retries.
pub struct TableStoreAdapter {
    connector: Arc<dyn TableConnector>,
    account: StorageAccount,
    table_name: String,
    partition_key: String,
    client: OnceCell<Arc<dyn TableClient>>,
    table: OnceCell<Arc<dyn Table>>,
    in_flight: AtomicUsize,
}

impl TableStoreAdapter {
    // == Constructor ==
    /// Validates every construction argument without performing any I/O.
    ///
    /// # Arguments
    /// * `connector` - Table service the client is built from
    /// * `credentials` - Connection string or account name + key
    /// * `table_name` - Backing table, created on first use if absent
    /// * `partition_key` - Partition shared by every entry of this cache
    pub fn new(
        connector: Arc<dyn TableConnector>,
        credentials: Credentials,
        table_name: impl Into<String>,
        partition_key: impl Into<String>,
    ) -> Result<Self> {
        let table_name = table_name.into();
        let partition_key = partition_key.into();

        if table_name.trim().is_empty() {
            return Err(CacheError::Configuration(
                "table name must not be empty".to_string(),
            ));
        }
        validate_table_name(&table_name)?;
        if partition_key.trim().is_empty() {
            return Err(CacheError::Configuration(
                "partition key must not be empty".to_string(),
            ));
        }
        if partition_key.contains('\0') {
            return Err(CacheError::Configuration(
                "partition key must not contain NUL characters".to_string(),
            ));
        }

        let account = credentials.resolve()?;

        Ok(Self {
            connector,
            account,
            table_name,
            partition_key,
            client: OnceCell::new(),
            table: OnceCell::new(),
            in_flight: AtomicUsize::new(0),
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    /// Reports where the adapter is in its connection lifecycle.
    pub fn connection_state(&self) -> ConnectionState {
        if self.table.initialized() {
            ConnectionState::Connected
        } else if self.in_flight.load(Ordering::SeqCst) > 0 {
            ConnectionState::Connecting
        } else {
            ConnectionState::Unconnected
        }
    }

    // == Connect ==
    /// Ensures a table handle exists, building the client and provisioning
    /// the table on first use.
    pub async fn connect(&self) -> Result<Arc<dyn Table>> {
        if let Some(table) = self.table.get() {
            return Ok(table.clone());
        }

        let _guard = InFlight::enter(&self.in_flight);
        self.table
            .get_or_try_init(|| self.provision())
            .await
            .cloned()
    }

    async fn provision(&self) -> Result<Arc<dyn Table>> {
        let client = self
            .client
            .get_or_try_init(|| async {
                debug!("Building table client for account '{}'", self.account.account_name);
                self.connector.connect(&self.account).await
            })
            .await?;

        let table = client.create_table_if_not_exists(&self.table_name).await?;
        info!(
            "Connected to table '{}' (partition '{}')",
            self.table_name, self.partition_key
        );
        Ok(table)
    }

    // == CRUD ==
    /// Point lookup by `(partition, key)`.
    pub async fn get_entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        let table = self.connect().await?;
        let row = table.retrieve(&self.partition_key, key).await?;
        Ok(row.map(entry_from_row))
    }

    /// Insert-or-replace; no distinction between create and update.
    pub async fn upsert_entry(&self, entry: &CacheEntry) -> Result<()> {
        let table = self.connect().await?;
        table.insert_or_replace(row_from_entry(entry)).await
    }

    /// Deletes by `(partition, key)`, returning whether a row existed.
    pub async fn delete_entry(&self, key: &str) -> Result<bool> {
        let table = self.connect().await?;
        table.delete(&self.partition_key, key).await
    }
}

/// Counts callers inside `connect`, including ones whose future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// == Row Mapping ==
/// Maps a cache entry onto the table's row shape.
pub(crate) fn row_from_entry(entry: &CacheEntry) -> TableRow {
    TableRow {
        partition_key: entry.partition.clone(),
        row_key: entry.key.clone(),
        data: entry.value.clone(),
        sliding_expiration: entry.sliding_expiration,
        absolute_expiration: entry.absolute_expiration,
        last_access_time: entry.last_access_time,
    }
}

/// Maps a stored row back into a cache entry.
pub(crate) fn entry_from_row(row: TableRow) -> CacheEntry {
    CacheEntry {
        partition: row.partition_key,
        key: row.row_key,
        value: row.data,
        sliding_expiration: row.sliding_expiration,
        absolute_expiration: row.absolute_expiration,
        last_access_time: row.last_access_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTableConnector;
    use chrono::Utc;
    use std::time::Duration;

    fn adapter(connector: &MemoryTableConnector) -> TableStoreAdapter {
        TableStoreAdapter::new(
            Arc::new(connector.clone()),
            Credentials::account_key("test", "key"),
            "cache",
            "partition",
        )
        .unwrap()
    }

    fn entry(key: &str, value: &[u8]) -> CacheEntry {
        CacheEntry {
            partition: "partition".to_string(),
            key: key.to_string(),
            value: value.to_vec(),
            sliding_expiration: Some(Duration::from_millis(2500)),
            absolute_expiration: Some(Utc::now() + chrono::Duration::seconds(60)),
            last_access_time: Some(Utc::now()),
        }
    }

    #[test]
    fn test_construction_validation() {
        let connector: Arc<dyn TableConnector> = Arc::new(MemoryTableConnector::new());
        let credentials = Credentials::account_key("a", "k");

        let cases = [
            ("", "p"),
            ("cache", ""),
            ("cache", "  "),
            ("bad-name", "p"),
            ("cache", "p\0q"),
        ];
        for (table, partition) in cases {
            let result =
                TableStoreAdapter::new(connector.clone(), credentials.clone(), table, partition);
            assert!(
                matches!(result, Err(CacheError::Configuration(_))),
                "expected rejection for ({:?}, {:?})",
                table,
                partition
            );
        }

        let result = TableStoreAdapter::new(
            connector,
            Credentials::connection_string("AccountName=a"),
            "cache",
            "p",
        );
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_construction_performs_no_io() {
        let connector = MemoryTableConnector::new();
        let adapter = adapter(&connector);

        assert_eq!(adapter.connection_state(), ConnectionState::Unconnected);
        assert_eq!(connector.clients_created(), 0);
        assert!(!connector.table_exists("cache").await);
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let connector = MemoryTableConnector::new();
        let adapter = adapter(&connector);

        adapter.connect().await.unwrap();
        adapter.connect().await.unwrap();
        adapter.get_entry("missing").await.unwrap();

        assert_eq!(adapter.connection_state(), ConnectionState::Connected);
        assert_eq!(connector.clients_created(), 1);
        assert_eq!(connector.provisioning_calls(), 1);
        assert!(connector.table_exists("cache").await);
    }

    #[tokio::test]
    async fn test_state_while_provisioning() {
        let connector = MemoryTableConnector::with_provisioning_delay(Duration::from_millis(200));
        let adapter = Arc::new(adapter(&connector));

        let pending = {
            let adapter = adapter.clone();
            tokio::spawn(async move { adapter.connect().await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(adapter.connection_state(), ConnectionState::Connecting);

        pending.await.unwrap().unwrap();
        assert_eq!(adapter.connection_state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_cancelled_connect_leaves_adapter_unconnected() {
        let connector = MemoryTableConnector::with_provisioning_delay(Duration::from_millis(200));
        let adapter = Arc::new(adapter(&connector));

        let pending = {
            let adapter = adapter.clone();
            tokio::spawn(async move { adapter.connect().await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(adapter.connection_state(), ConnectionState::Connecting);

        pending.abort();
        assert!(pending.await.unwrap_err().is_cancelled());
        assert_eq!(adapter.connection_state(), ConnectionState::Unconnected);
        assert!(!connector.table_exists("cache").await);

        adapter.connect().await.unwrap();
        assert_eq!(adapter.connection_state(), ConnectionState::Connected);
        assert_eq!(connector.clients_created(), 1);
        assert_eq!(connector.provisioning_calls(), 2);
        assert!(connector.table_exists("cache").await);
    }

    #[tokio::test]
    async fn test_failed_connect_stays_unconnected() {
        let connector = MemoryTableConnector::new();
        let adapter = adapter(&connector);

        connector.set_unavailable(true);
        assert!(matches!(
            adapter.connect().await,
            Err(CacheError::Connection(_))
        ));
        assert_eq!(adapter.connection_state(), ConnectionState::Unconnected);

        connector.set_unavailable(false);
        adapter.connect().await.unwrap();
        assert_eq!(adapter.connection_state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_entry_roundtrip_through_row() {
        let connector = MemoryTableConnector::new();
        let adapter = adapter(&connector);
        let stored = entry("k", b"bytes");

        adapter.upsert_entry(&stored).await.unwrap();
        let loaded = adapter.get_entry("k").await.unwrap().unwrap();

        assert_eq!(loaded, stored);
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let connector = MemoryTableConnector::new();
        let adapter = adapter(&connector);

        adapter.upsert_entry(&entry("k", b"v")).await.unwrap();
        assert!(adapter.delete_entry("k").await.unwrap());
        assert!(!adapter.delete_entry("k").await.unwrap());
        assert!(adapter.get_entry("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sub_millisecond_sliding_window_persists_exactly() {
        let connector = MemoryTableConnector::new();
        let adapter = adapter(&connector);

        for window in [Duration::from_micros(1500), Duration::from_micros(500)] {
            let mut stored = entry("k", b"v");
            stored.sliding_expiration = Some(window);

            adapter.upsert_entry(&stored).await.unwrap();
            let loaded = adapter.get_entry("k").await.unwrap().unwrap();

            assert_eq!(loaded.sliding_expiration, Some(window));
            assert_eq!(loaded, stored);
        }
    }

    #[test]
    fn test_row_mapping_keeps_identity() {
        let stored = entry("key", b"v");
        let row = row_from_entry(&stored);

        assert_eq!(row.partition_key, "partition");
        assert_eq!(row.row_key, "key");
        assert_eq!(row.sliding_expiration, Some(Duration::from_millis(2500)));
        assert_eq!(entry_from_row(row), stored);
    }
}

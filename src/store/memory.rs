//! In-Memory Table Service
//!
//! Process-local table service. Tables outlive the clients that created
//! them, so several cache instances built from one connector share data.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StorageAccount, Table, TableClient, TableConnector, TableRow};
use crate::error::{CacheError, Result};

#[derive(Debug, Default)]
struct Shared {
    tables: RwLock<HashMap<String, Arc<MemoryTable>>>,
    clients_created: AtomicUsize,
    provisioning_calls: AtomicUsize,
    unavailable: AtomicBool,
    provisioning_delay: Option<Duration>,
}

impl Shared {
    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Store("table service unavailable".to_string()));
        }
        Ok(())
    }
}

// == Memory Table Connector ==
/// Connector for the in-memory table service.
///
/// Cloning yields another handle to the same service.
#[derive(Debug, Clone, Default)]
pub struct MemoryTableConnector {
    shared: Arc<Shared>,
}

impl MemoryTableConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every provisioning call, widening the window in which
    /// concurrent first connections could race.
    pub fn with_provisioning_delay(delay: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                provisioning_delay: Some(delay),
                ..Shared::default()
            }),
        }
    }

    /// Makes every connect, provisioning and row operation fail until
    /// switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of clients built so far.
    pub fn clients_created(&self) -> usize {
        self.shared.clients_created.load(Ordering::SeqCst)
    }

    /// Number of `create_table_if_not_exists` calls that reached the service.
    pub fn provisioning_calls(&self) -> usize {
        self.shared.provisioning_calls.load(Ordering::SeqCst)
    }

    /// Number of rows currently held in `table`, expired or not.
    pub async fn row_count(&self, table: &str) -> usize {
        let tables = self.shared.tables.read().await;
        match tables.get(table) {
            Some(table) => table.rows.read().await.len(),
            None => 0,
        }
    }

    /// Whether `table` has been provisioned.
    pub async fn table_exists(&self, table: &str) -> bool {
        self.shared.tables.read().await.contains_key(table)
    }
}

#[async_trait]
impl TableConnector for MemoryTableConnector {
    async fn connect(&self, _account: &StorageAccount) -> Result<Arc<dyn TableClient>> {
        if self.shared.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Connection(
                "table service unavailable".to_string(),
            ));
        }
        self.shared.clients_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MemoryTableClient {
            shared: self.shared.clone(),
        }))
    }
}

struct MemoryTableClient {
    shared: Arc<Shared>,
}

#[async_trait]
impl TableClient for MemoryTableClient {
    async fn create_table_if_not_exists(&self, name: &str) -> Result<Arc<dyn Table>> {
        self.shared.provisioning_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.shared.provisioning_delay {
            tokio::time::sleep(delay).await;
        }
        if self.shared.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Connection(format!(
                "failed to provision table '{}': table service unavailable",
                name
            )));
        }

        let mut tables = self.shared.tables.write().await;
        let table: Arc<dyn Table> = tables
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(MemoryTable {
                    shared: Arc::downgrade(&self.shared),
                    rows: RwLock::new(HashMap::new()),
                })
            })
            .clone();

        Ok(table)
    }
}

// == Memory Table ==
#[derive(Debug)]
struct MemoryTable {
    // Weak so the connector's table map does not keep itself alive
    shared: std::sync::Weak<Shared>,
    rows: RwLock<HashMap<(String, String), TableRow>>,
}

impl MemoryTable {
    fn check_available(&self) -> Result<()> {
        match self.shared.upgrade() {
            Some(shared) => shared.check_available(),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Table for MemoryTable {
    async fn retrieve(&self, partition_key: &str, row_key: &str) -> Result<Option<TableRow>> {
        self.check_available()?;
        let rows = self.rows.read().await;
        Ok(rows
            .get(&(partition_key.to_string(), row_key.to_string()))
            .cloned())
    }

    async fn insert_or_replace(&self, row: TableRow) -> Result<()> {
        self.check_available()?;
        let mut rows = self.rows.write().await;
        rows.insert((row.partition_key.clone(), row.row_key.clone()), row);
        Ok(())
    }

    async fn delete(&self, partition_key: &str, row_key: &str) -> Result<bool> {
        self.check_available()?;
        let mut rows = self.rows.write().await;
        Ok(rows
            .remove(&(partition_key.to_string(), row_key.to_string()))
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Credentials;

    fn account() -> StorageAccount {
        Credentials::account_key("test", "key").resolve().unwrap()
    }

    fn row(partition: &str, key: &str, data: &[u8]) -> TableRow {
        TableRow {
            partition_key: partition.to_string(),
            row_key: key.to_string(),
            data: data.to_vec(),
            sliding_expiration: None,
            absolute_expiration: None,
            last_access_time: None,
        }
    }

    #[tokio::test]
    async fn test_tables_shared_across_clients() {
        let connector = MemoryTableConnector::new();

        let first = connector.connect(&account()).await.unwrap();
        let table = first.create_table_if_not_exists("cache").await.unwrap();
        table.insert_or_replace(row("p", "k", b"v")).await.unwrap();

        let second = connector.connect(&account()).await.unwrap();
        let table = second.create_table_if_not_exists("cache").await.unwrap();
        let found = table.retrieve("p", "k").await.unwrap().unwrap();

        assert_eq!(found.data, b"v");
        assert_eq!(connector.clients_created(), 2);
        assert_eq!(connector.provisioning_calls(), 2);
        assert_eq!(connector.row_count("cache").await, 1);
    }

    #[tokio::test]
    async fn test_partitions_are_isolated() {
        let connector = MemoryTableConnector::new();
        let client = connector.connect(&account()).await.unwrap();
        let table = client.create_table_if_not_exists("cache").await.unwrap();

        table.insert_or_replace(row("a", "k", b"1")).await.unwrap();
        table.insert_or_replace(row("b", "k", b"2")).await.unwrap();

        assert_eq!(table.retrieve("a", "k").await.unwrap().unwrap().data, b"1");
        assert_eq!(table.retrieve("b", "k").await.unwrap().unwrap().data, b"2");
        assert!(table.delete("a", "k").await.unwrap());
        assert!(!table.delete("a", "k").await.unwrap());
        assert!(table.retrieve("b", "k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unavailable_service() {
        let connector = MemoryTableConnector::new();
        let client = connector.connect(&account()).await.unwrap();
        let table = client.create_table_if_not_exists("cache").await.unwrap();

        connector.set_unavailable(true);
        assert!(matches!(
            connector.connect(&account()).await,
            Err(CacheError::Connection(_))
        ));
        assert!(matches!(
            table.retrieve("p", "k").await,
            Err(CacheError::Store(_))
        ));

        connector.set_unavailable(false);
        assert!(table.retrieve("p", "k").await.unwrap().is_none());
    }
}

//! Sled-backed Table Service
//!
//! Local table service persisting each account in its own sled database
//! under a root directory. Every table is a sled tree; rows are stored as
//! JSON under `partition \0 row`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use super::{StorageAccount, Table, TableClient, TableConnector, TableRow};
use crate::error::{CacheError, Result};

const ACCOUNT_TREE: &str = "__account";
const ACCOUNT_KEY_FIELD: &str = "account_key";

// == Sled Table Connector ==
/// Connector for the sled-backed table service.
pub struct SledTableConnector {
    root: PathBuf,
    // sled locks its directory, so each account is opened once per process
    databases: Mutex<HashMap<String, sled::Db>>,
}

impl SledTableConnector {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            databases: Mutex::new(HashMap::new()),
        }
    }

    fn open(&self, account_name: &str) -> Result<sled::Db> {
        let mut databases = self
            .databases
            .lock()
            .map_err(|_| CacheError::Connection("database registry poisoned".to_string()))?;

        if let Some(db) = databases.get(account_name) {
            return Ok(db.clone());
        }

        std::fs::create_dir_all(&self.root).map_err(|e| {
            CacheError::Connection(format!("Failed to create directory: {}", e))
        })?;

        let path = self.root.join(account_name);
        let db = sled::open(&path)
            .map_err(|e| CacheError::Connection(format!("Failed to open Sled database: {}", e)))?;

        info!("Opened table storage for account '{}' at {}", account_name, path.display());
        databases.insert(account_name.to_string(), db.clone());
        Ok(db)
    }
}

/// Rejects account names that would escape the root directory.
fn validate_account_name(name: &str) -> Result<()> {
    if name.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(CacheError::Configuration(format!(
            "invalid account name '{}': expected alphanumeric characters",
            name
        )))
    }
}

#[async_trait]
impl TableConnector for SledTableConnector {
    async fn connect(&self, account: &StorageAccount) -> Result<Arc<dyn TableClient>> {
        validate_account_name(&account.account_name)?;
        let db = self.open(&account.account_name)?;

        let meta = db
            .open_tree(ACCOUNT_TREE)
            .map_err(|e| CacheError::Connection(format!("Failed to open account metadata: {}", e)))?;

        // First connection registers the key; later ones must present it
        let registered = meta
            .compare_and_swap(
                ACCOUNT_KEY_FIELD,
                None as Option<&[u8]>,
                Some(account.account_key.as_bytes()),
            )
            .map_err(|e| CacheError::Connection(format!("Failed to read account metadata: {}", e)))?;

        if let Err(existing) = registered {
            let matches = existing
                .current
                .as_deref()
                .is_some_and(|key| key == account.account_key.as_bytes());
            if !matches {
                return Err(CacheError::Connection(format!(
                    "authentication failed for account '{}'",
                    account.account_name
                )));
            }
        }

        Ok(Arc::new(SledTableClient { db }))
    }
}

struct SledTableClient {
    db: sled::Db,
}

#[async_trait]
impl TableClient for SledTableClient {
    async fn create_table_if_not_exists(&self, name: &str) -> Result<Arc<dyn Table>> {
        let tree = self.db.open_tree(name).map_err(|e| {
            CacheError::Connection(format!("Failed to provision table '{}': {}", name, e))
        })?;
        Ok(Arc::new(SledTable { tree }))
    }
}

// == Sled Table ==
struct SledTable {
    tree: sled::Tree,
}

fn row_key(partition_key: &str, row_key: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(partition_key.len() + row_key.len() + 1);
    key.extend_from_slice(partition_key.as_bytes());
    key.push(0);
    key.extend_from_slice(row_key.as_bytes());
    key
}

impl SledTable {
    async fn flush(&self) -> Result<()> {
        self.tree
            .flush_async()
            .await
            .map_err(|e| CacheError::Store(format!("Failed to flush table: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl Table for SledTable {
    async fn retrieve(&self, partition_key: &str, row: &str) -> Result<Option<TableRow>> {
        let value = self
            .tree
            .get(row_key(partition_key, row))
            .map_err(|e| CacheError::Store(format!("Failed to read row: {}", e)))?;

        match value {
            Some(bytes) => {
                let row: TableRow = serde_json::from_slice(&bytes)
                    .map_err(|e| CacheError::Store(format!("Failed to deserialize row: {}", e)))?;
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }

    async fn insert_or_replace(&self, row: TableRow) -> Result<()> {
        let key = row_key(&row.partition_key, &row.row_key);
        let value = serde_json::to_vec(&row)
            .map_err(|e| CacheError::Store(format!("Failed to serialize row: {}", e)))?;

        self.tree
            .insert(key, value)
            .map_err(|e| CacheError::Store(format!("Failed to write row: {}", e)))?;
        self.flush().await
    }

    async fn delete(&self, partition_key: &str, row: &str) -> Result<bool> {
        let removed = self
            .tree
            .remove(row_key(partition_key, row))
            .map_err(|e| CacheError::Store(format!("Failed to delete row: {}", e)))?
            .is_some();
        self.flush().await?;
        Ok(removed)
    }
}

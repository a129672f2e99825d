//! Table Cache - A distributed cache client over a partitioned key-value table
//!
//! Stores opaque byte values in one partition of a remote table and adds
//! absolute and sliding expiration on top of it.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use api::AppState;
pub use cache::{BlockingTableCache, DistributedCache, EntryOptions, TableStorageCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use store::{Credentials, MemoryTableConnector, SledTableConnector};

//! Cache Module
//!
//! Cache entries, expiration policy and the handler exposing
//! get/set/refresh/remove over a table store.

mod blocking;
mod entry;
mod handler;
mod options;
pub mod policy;


// Re-export public types
pub use blocking::BlockingTableCache;
pub use entry::CacheEntry;
pub use handler::{DistributedCache, TableStorageCache};
pub use options::EntryOptions;

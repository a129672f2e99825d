//! Cache Entry Module
//!
//! Defines the record persisted for each cached key.

use std::time::Duration;

use chrono::{DateTime, Utc};

// == Cache Entry ==
/// Represents a single cache entry with value and expiration metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Partition shared by every entry of one cache instance
    pub partition: String,
    /// Caller-supplied key, unique within the partition
    pub key: String,
    /// The stored value
    pub value: Vec<u8>,
    /// Idle window after which the entry expires
    pub sliding_expiration: Option<Duration>,
    /// Instant after which the entry is never valid
    pub absolute_expiration: Option<DateTime<Utc>>,
    /// Anchor for the sliding window
    pub last_access_time: Option<DateTime<Utc>>,
}

impl CacheEntry {
    // == Sliding Deadline ==
    /// Instant at which the sliding window closes.
    ///
    /// # Returns
    /// - `Some(last_access_time + sliding_expiration)` when both are set
    /// - `None` when either is missing, or the deadline is not representable
    pub fn sliding_deadline(&self) -> Option<DateTime<Utc>> {
        let window = chrono::Duration::from_std(self.sliding_expiration?).ok()?;
        self.last_access_time?.checked_add_signed(window)
    }

    // == Idle Time ==
    /// Time elapsed since the last recorded access, or None if never recorded.
    pub fn idle_time(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.last_access_time.map(|last| now - last)
    }
}

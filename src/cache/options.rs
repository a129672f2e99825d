//! Entry Options Module
//!
//! Caller-supplied expiration settings for a single `set`.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{CacheError, Result};

// == Entry Options ==
/// Expiration settings applied when an entry is written.
///
/// When both absolute forms are given, the relative one takes precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryOptions {
    /// Fixed instant after which the entry is invalid
    pub absolute_expiration: Option<DateTime<Utc>>,
    /// Absolute expiration expressed relative to the write instant
    pub absolute_expiration_relative_to_now: Option<Duration>,
    /// Idle window measured from the last access
    pub sliding_expiration: Option<Duration>,
}

impl EntryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_absolute_expiration(mut self, at: DateTime<Utc>) -> Self {
        self.absolute_expiration = Some(at);
        self
    }

    pub fn with_absolute_expiration_relative_to_now(mut self, after: Duration) -> Self {
        self.absolute_expiration_relative_to_now = Some(after);
        self
    }

    pub fn with_sliding_expiration(mut self, window: Duration) -> Self {
        self.sliding_expiration = Some(window);
        self
    }

    // == Validate ==
    /// Rejects zero-length durations.
    ///
    /// Whether a fixed absolute expiration lies in the future depends on the
    /// write instant and is checked by the expiration policy instead.
    pub fn validate(&self) -> Result<()> {
        if self.absolute_expiration_relative_to_now == Some(Duration::ZERO) {
            return Err(CacheError::Configuration(
                "the relative expiration value must be positive".to_string(),
            ));
        }
        if self.sliding_expiration == Some(Duration::ZERO) {
            return Err(CacheError::Configuration(
                "the sliding expiration value must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

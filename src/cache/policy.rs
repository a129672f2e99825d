//! Expiration Policy Module
//!
//! Pure expiration decisions. Nothing here performs I/O or reads the clock;
//! callers pass `now` in.
//!
//! Expiration is lazy: an expired entry stays in the table until a refresh
//! examines it or it is removed explicitly. There is no background sweep.

use chrono::{DateTime, Utc};

use crate::cache::{CacheEntry, EntryOptions};
use crate::error::{CacheError, Result};

// == Compute Absolute Expiration ==
/// Computes the absolute expiration instant to persist for a write at `now`.
///
/// # Returns
/// - `now + relative` when a relative expiration is given
/// - the fixed instant when it lies strictly after `now`
/// - `None` when neither is given
///
/// # Errors
/// `CacheError::Configuration` when the options are invalid or the fixed
/// instant is not in the future.
pub fn compute_absolute_expiration(
    now: DateTime<Utc>,
    options: &EntryOptions,
) -> Result<Option<DateTime<Utc>>> {
    options.validate()?;

    if let Some(relative) = options.absolute_expiration_relative_to_now {
        let delta = chrono::Duration::from_std(relative).map_err(|_| {
            CacheError::Configuration("the relative expiration value is too large".to_string())
        })?;
        let at = now.checked_add_signed(delta).ok_or_else(|| {
            CacheError::Configuration("the relative expiration value is too large".to_string())
        })?;
        return Ok(Some(at));
    }

    if let Some(at) = options.absolute_expiration {
        if at <= now {
            return Err(CacheError::Configuration(format!(
                "the absolute expiration value must be in the future (got {}, now {})",
                at.to_rfc3339(),
                now.to_rfc3339()
            )));
        }
        return Ok(Some(at));
    }

    Ok(None)
}

// == Is Expired ==
/// Checks whether `entry` is expired at `now`.
///
/// Boundary condition: both deadlines are inclusive. An entry is expired
/// once `now` reaches its absolute expiration, or once `now` reaches
/// `last_access_time + sliding_expiration`.
pub fn is_expired(entry: &CacheEntry, now: DateTime<Utc>) -> bool {
    if entry.absolute_expiration.is_some_and(|at| now >= at) {
        return true;
    }

    entry
        .sliding_deadline()
        .is_some_and(|deadline| now >= deadline)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn entry(
        absolute: Option<DateTime<Utc>>,
        sliding: Option<Duration>,
        last_access: Option<DateTime<Utc>>,
    ) -> CacheEntry {
        CacheEntry {
            partition: "p".to_string(),
            key: "k".to_string(),
            value: b"v".to_vec(),
            sliding_expiration: sliding,
            absolute_expiration: absolute,
            last_access_time: last_access,
        }
    }

    #[test]
    fn test_no_options_no_expiration() {
        let now = Utc::now();
        assert_eq!(
            compute_absolute_expiration(now, &EntryOptions::default()).unwrap(),
            None
        );
    }

    #[test]
    fn test_relative_expiration() {
        let now = Utc::now();
        let options = EntryOptions::new().with_absolute_expiration_relative_to_now(Duration::from_secs(90));

        assert_eq!(
            compute_absolute_expiration(now, &options).unwrap(),
            Some(now + chrono::Duration::seconds(90))
        );
    }

    #[test]
    fn test_relative_takes_precedence_over_fixed() {
        let now = Utc::now();
        // A past fixed instant is ignored when a relative value is present
        let options = EntryOptions::new()
            .with_absolute_expiration(now - chrono::Duration::seconds(1))
            .with_absolute_expiration_relative_to_now(Duration::from_secs(10));

        assert_eq!(
            compute_absolute_expiration(now, &options).unwrap(),
            Some(now + chrono::Duration::seconds(10))
        );
    }

    #[test]
    fn test_fixed_future_expiration() {
        let now = Utc::now();
        let at = now + chrono::Duration::minutes(5);
        let options = EntryOptions::new().with_absolute_expiration(at);

        assert_eq!(compute_absolute_expiration(now, &options).unwrap(), Some(at));
    }

    #[test]
    fn test_fixed_past_or_present_rejected() {
        let now = Utc::now();

        for at in [now - chrono::Duration::seconds(1), now] {
            let options = EntryOptions::new().with_absolute_expiration(at);
            assert!(matches!(
                compute_absolute_expiration(now, &options),
                Err(CacheError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_relative_overflow_rejected() {
        let now = Utc::now();
        let options =
            EntryOptions::new().with_absolute_expiration_relative_to_now(Duration::from_secs(u64::MAX));

        assert!(matches!(
            compute_absolute_expiration(now, &options),
            Err(CacheError::Configuration(_))
        ));
    }

    #[test]
    fn test_entry_without_metadata_never_expires() {
        let now = Utc::now();
        assert!(!is_expired(&entry(None, None, None), now));
        assert!(!is_expired(&entry(None, None, Some(now - chrono::Duration::days(365))), now));
    }

    #[test]
    fn test_absolute_boundary() {
        let now = Utc::now();

        assert!(is_expired(&entry(Some(now), None, None), now));
        assert!(is_expired(&entry(Some(now - chrono::Duration::milliseconds(1)), None, None), now));
        assert!(!is_expired(&entry(Some(now + chrono::Duration::milliseconds(1)), None, None), now));
    }

    #[test]
    fn test_sliding_within_window() {
        let now = Utc::now();
        let e = entry(None, Some(Duration::from_secs(10)), Some(now - chrono::Duration::seconds(3)));

        assert!(!is_expired(&e, now));
    }

    #[test]
    fn test_sliding_idle_beyond_window() {
        let now = Utc::now();
        let e = entry(None, Some(Duration::from_secs(1)), Some(now - chrono::Duration::seconds(2)));

        assert!(is_expired(&e, now));
    }

    #[test]
    fn test_sliding_fresh_entry_not_expired() {
        // Idle time ~0 is well inside the window
        let now = Utc::now();
        let e = entry(None, Some(Duration::from_secs(1)), Some(now));

        assert!(!is_expired(&e, now));
    }

    #[test]
    fn test_sliding_without_last_access_ignored() {
        let now = Utc::now();
        let e = entry(None, Some(Duration::from_millis(1)), None);

        assert!(!is_expired(&e, now));
    }

    #[test]
    fn test_absolute_wins_over_open_sliding_window() {
        let now = Utc::now();
        let e = entry(
            Some(now - chrono::Duration::seconds(1)),
            Some(Duration::from_secs(3600)),
            Some(now),
        );

        assert!(is_expired(&e, now));
    }
}

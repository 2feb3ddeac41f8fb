use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::cache::staleness::is_fresh;
use crate::models::cache::CacheRecord;

/// Requested identifiers split by whether the cache can serve them.
/// Both lists keep the order of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub fresh: Vec<i64>,
    pub needs_refresh: Vec<i64>,
}

/// Splits `requested` into fresh and stale-or-missing identifiers.
///
/// `existing` must only contain records of the caller's (owner, project) scope.
pub fn partition(
    requested: &[i64],
    existing: &HashMap<i64, CacheRecord>,
    now: DateTime<Utc>,
    expiry_window: Duration,
) -> Partition {
    let mut out = Partition::default();
    for &id in requested {
        match existing.get(&id) {
            Some(record) if is_fresh(record.written_at, now, expiry_window) => out.fresh.push(id),
            _ => out.needs_refresh.push(id),
        }
    }
    out
}

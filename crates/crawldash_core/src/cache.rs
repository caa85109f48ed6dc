//! Query cache with explicit invalidation.
//!
//! Entries are keyed by [`QueryKey`]. Each entry remembers the last value that
//! was fetched successfully, whether that value is still valid, how many views
//! currently observe it, and which request (if any) is in flight for it.
//!
//! Only the most recently issued request for a key may commit. A response for
//! a superseded or cancelled request is dropped on arrival, so results for old
//! parameters can never overwrite what the current parameters show.
//!
//! Unobserved entries are kept so that returning to a page is instant, but
//! at most [`MAX_IDLE_ENTRIES`] of them; the least recently left are evicted
//! first. Invalidating an unobserved entry evicts it outright.

use std::collections::BTreeMap;

use dash_logging::{dash_debug, dash_trace};

use crate::{Analysis, KeyPattern, QueryError, QueryKey, Stats, UrlPage};

pub type RequestId = u64;

/// Unobserved entries kept before the least recently left one is evicted.
pub const MAX_IDLE_ENTRIES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Urls(UrlPage),
    Analysis(Analysis),
    Stats(Stats),
}

/// A fetch the caller must perform and report back through
/// [`QueryCache::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub request_id: RequestId,
    pub key: QueryKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct CacheEntry {
    value: Option<QueryValue>,
    valid: bool,
    error: Option<QueryError>,
    fetching: Option<RequestId>,
    observers: usize,
    /// When the last observer left; orders eviction.
    idle_since: u64,
}

/// Read-only view of one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuerySnapshot<'a> {
    /// Last successfully fetched value, kept across failures and invalidation.
    pub value: Option<&'a QueryValue>,
    /// Error of the most recent completed fetch, if it failed.
    pub error: Option<&'a QueryError>,
    pub fetching: bool,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryCache {
    entries: BTreeMap<QueryKey, CacheEntry>,
    in_flight: BTreeMap<RequestId, QueryKey>,
    next_request_id: RequestId,
    idle_clock: u64,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every entry and in-flight request. Request ids keep counting so
    /// responses issued before the reset can never match a new request.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.in_flight.clear();
    }

    /// Last fetched value for `key`, valid or not.
    pub fn get(&self, key: &QueryKey) -> Option<&QueryValue> {
        self.entries.get(key).and_then(|entry| entry.value.as_ref())
    }

    pub fn snapshot(&self, key: &QueryKey) -> QuerySnapshot<'_> {
        match self.entries.get(key) {
            Some(entry) => QuerySnapshot {
                value: entry.value.as_ref(),
                error: entry.error.as_ref(),
                fetching: entry.fetching.is_some(),
                valid: entry.valid,
            },
            None => QuerySnapshot::default(),
        }
    }

    pub fn is_valid(&self, key: &QueryKey) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.valid)
    }

    pub fn observers(&self, key: &QueryKey) -> usize {
        self.entries.get(key).map_or(0, |entry| entry.observers)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries no view observes.
    pub fn idle_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.observers == 0).count()
    }

    /// Starts observing `key`. Returns a fetch when the key has no valid value
    /// and nothing is in flight for it yet.
    pub fn subscribe(&mut self, key: QueryKey) -> Option<FetchRequest> {
        let entry = self.entries.entry(key.clone()).or_default();
        entry.observers += 1;
        if entry.valid || entry.fetching.is_some() {
            return None;
        }
        Some(self.begin_fetch(key))
    }

    /// Stops observing `key`. When the last observer leaves, any in-flight
    /// request for the key is cancelled and its response will be discarded.
    pub fn unsubscribe(&mut self, key: &QueryKey) {
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        entry.observers = entry.observers.saturating_sub(1);
        if entry.observers > 0 {
            return;
        }
        if let Some(request_id) = entry.fetching.take() {
            dash_debug!("Cancelled request {} for {:?}", request_id, key);
            self.in_flight.remove(&request_id);
        }
        if entry.value.is_none() {
            self.entries.remove(key);
            return;
        }
        self.idle_clock += 1;
        entry.idle_since = self.idle_clock;
        self.evict_idle();
    }

    fn evict_idle(&mut self) {
        let mut idle: Vec<(u64, QueryKey)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.observers == 0)
            .map(|(key, entry)| (entry.idle_since, key.clone()))
            .collect();
        if idle.len() <= MAX_IDLE_ENTRIES {
            return;
        }
        idle.sort();
        let excess = idle.len() - MAX_IDLE_ENTRIES;
        for (_, key) in idle.into_iter().take(excess) {
            dash_trace!("Evicted idle entry {:?}", key);
            self.entries.remove(&key);
        }
    }

    /// Marks every entry matching `pattern` invalid. Observed entries are
    /// re-fetched right away; the returned requests must be performed.
    /// Unobserved entries are evicted and fetched on their next subscription.
    pub fn invalidate(&mut self, pattern: &KeyPattern) -> Vec<FetchRequest> {
        let matching: Vec<QueryKey> = self
            .entries
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect();

        let mut requests = Vec::new();
        let mut evicted = 0;
        for key in matching {
            let observed = match self.entries.get_mut(&key) {
                Some(entry) => {
                    entry.valid = false;
                    entry.observers > 0
                }
                None => false,
            };
            if observed {
                requests.push(self.begin_fetch(key));
            } else {
                self.entries.remove(&key);
                evicted += 1;
            }
        }
        dash_trace!(
            "Invalidated {:?}, {} observed key(s) re-fetching, {} evicted",
            pattern,
            requests.len(),
            evicted
        );
        requests
    }

    /// Applies the outcome of a fetch. Returns the key the result was stored
    /// under, or `None` if the request was superseded or cancelled.
    ///
    /// A failure keeps the previous value so views can keep showing it.
    pub fn complete(
        &mut self,
        request_id: RequestId,
        result: Result<QueryValue, QueryError>,
    ) -> Option<QueryKey> {
        let Some(key) = self.in_flight.remove(&request_id) else {
            dash_debug!("Discarded stale response for request {}", request_id);
            return None;
        };
        let entry = self.entries.get_mut(&key)?;
        if entry.fetching != Some(request_id) {
            return None;
        }
        entry.fetching = None;
        match result {
            Ok(value) => {
                entry.value = Some(value);
                entry.valid = true;
                entry.error = None;
            }
            Err(err) => {
                entry.error = Some(err);
            }
        }
        Some(key)
    }

    fn begin_fetch(&mut self, key: QueryKey) -> FetchRequest {
        self.next_request_id += 1;
        let request_id = self.next_request_id;
        if let Some(entry) = self.entries.get_mut(&key) {
            if let Some(previous) = entry.fetching.replace(request_id) {
                dash_debug!("Request {} superseded by {}", previous, request_id);
                self.in_flight.remove(&previous);
            }
        }
        self.in_flight.insert(request_id, key.clone());
        FetchRequest { request_id, key }
    }
}

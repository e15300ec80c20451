//! Page cache keyed by the canonical filter query, plus request bookkeeping that
//! lets only the most recently issued fetch update the display.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;

use lru::LruCache;

use crate::documents::ResultPage;

pub type RequestId = u64;

pub const DEFAULT_CACHE_CAPACITY: usize = 32;

/// Least-recently-used page cache. Only successful pages go in.
#[derive(Clone)]
pub struct ResultCache {
    pages: LruCache<String, ResultPage>,
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("capacity", &self.pages.cap())
            .field("keys", &self.pages.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}

impl PartialEq for ResultCache {
    fn eq(&self, other: &Self) -> bool {
        self.pages.cap() == other.pages.cap() && self.pages.iter().eq(other.pages.iter())
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl ResultCache {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            pages: LruCache::new(capacity),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<&ResultPage> {
        self.pages.get(key)
    }

    pub fn insert(&mut self, key: String, page: ResultPage) {
        self.pages.put(key, page);
    }

    pub fn invalidate(&mut self, key: &str) {
        self.pages.pop(key);
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Tracks the latest issued page request. Responses are matched by request id
/// and key, never by arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequests {
    next_id: RequestId,
    latest: Option<(RequestId, String)>,
    // Per forced key, the first request whose response may be cached again.
    fresh_from: HashMap<String, RequestId>,
}

impl PageRequests {
    pub fn issue(&mut self, key: &str) -> RequestId {
        self.next_id += 1;
        self.latest = Some((self.next_id, key.to_string()));
        self.next_id
    }

    pub fn is_latest(&self, request_id: RequestId, key: &str) -> bool {
        matches!(&self.latest, Some((id, k)) if *id == request_id && k == key)
    }

    /// Pending key, if the latest request has not resolved yet.
    pub fn pending_key(&self) -> Option<&str> {
        self.latest.as_ref().map(|(_, key)| key.as_str())
    }

    pub fn settle(&mut self, request_id: RequestId) {
        if matches!(&self.latest, Some((id, _)) if *id == request_id) {
            self.latest = None;
        }
    }

    /// Responses to requests for `key` issued before `request_id` carry data
    /// older than a forced refresh and must not be cached.
    pub fn require_fresh(&mut self, key: &str, request_id: RequestId) {
        self.fresh_from.insert(key.to_string(), request_id);
    }

    /// Whether a response may go into the cache.
    pub fn admit(&self, request_id: RequestId, key: &str) -> bool {
        self.fresh_from
            .get(key)
            .map_or(true, |&floor| request_id >= floor)
    }

    /// Forget any pending request so its response is discarded.
    pub fn supersede(&mut self) {
        self.latest = None;
    }
}

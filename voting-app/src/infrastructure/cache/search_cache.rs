use crate::domain::Character;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use voting_errors::AppError;

/// Freshness window of a cached search.
pub const SEARCH_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Clone)]
struct CacheEntry {
    results: Vec<Character>,
    fetched_at: Instant,
}

/// Search results keyed by the exact query string.
///
/// A disabled cache behaves as a permanent miss.
#[derive(Clone)]
pub struct SearchCache {
    entries: Option<Arc<DashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl SearchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Some(Arc::new(DashMap::new())),
            ttl,
        }
    }

    pub fn disabled() -> Self {
        Self {
            entries: None,
            ttl: SEARCH_CACHE_TTL,
        }
    }

    pub fn get(&self, query: &str) -> Option<Vec<Character>> {
        let entries = self.store().ok()?;
        let now = Instant::now();

        let fresh = {
            let entry = entries.get(query)?;
            if now.duration_since(entry.fetched_at) <= self.ttl {
                Some(entry.results.clone())
            } else {
                None
            }
        };

        if fresh.is_none() {
            entries.remove(query);
            tracing::debug!("Evicted stale search cache entry for {:?}", query);
        }
        fresh
    }

    pub fn put(&self, query: &str, results: Vec<Character>) {
        if query.trim().is_empty() {
            return;
        }
        let Ok(entries) = self.store() else {
            return;
        };
        entries.insert(
            query.to_string(),
            CacheEntry {
                results,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drop everything; any vote may change counts shown in cached results.
    pub fn invalidate_all(&self) {
        if let Ok(entries) = self.store() {
            let dropped = entries.len();
            entries.clear();
            tracing::debug!("Search cache cleared ({} entries)", dropped);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |e| e.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn store(&self) -> Result<&DashMap<String, CacheEntry>, AppError> {
        match &self.entries {
            Some(entries) => Ok(entries),
            None => {
                tracing::debug!("{}", AppError::CacheUnavailable);
                Err(AppError::CacheUnavailable)
            }
        }
    }
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new(SEARCH_CACHE_TTL)
    }
}

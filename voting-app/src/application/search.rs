use super::ports::RemoteData;
use super::{adjust_votes, Revision};
use crate::domain::{Character, CharacterId};
use crate::infrastructure::cache::SearchCache;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use voting_errors::AppError;

pub const SEARCH_RESULT_LIMIT: usize = 50;
pub const LISTING_LIMIT: usize = 25;
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub query: String,
    pub characters: Vec<Character>,
    pub loading: bool,
    pub error: Option<String>,
    /// Bumped every time `characters` is replaced by a fetch.
    pub revision: Revision,
    /// Sequence number of the latest `set_query`; older work is discarded.
    request: u64,
}

/// Cache first for non-empty queries, then the hosted search or listing.
pub async fn lookup(
    remote: &dyn RemoteData,
    cache: &SearchCache,
    query: &str,
) -> Result<Vec<Character>, AppError> {
    let term = query.trim();
    if term.is_empty() {
        return remote.list_alphabetical(LISTING_LIMIT).await;
    }

    if let Some(cached) = cache.get(query) {
        tracing::debug!("Search cache hit for {:?}", query);
        return Ok(cached);
    }

    let results = remote.search_ranked(term, SEARCH_RESULT_LIMIT).await?;
    cache.put(query, results.clone());
    Ok(results)
}

struct Inner {
    remote: Arc<dyn RemoteData>,
    cache: SearchCache,
    debounce: Duration,
    state: watch::Sender<SearchState>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

/// Debounced character search. Last query wins.
#[derive(Clone)]
pub struct CharacterSearch {
    inner: Arc<Inner>,
}

impl CharacterSearch {
    pub fn new(remote: Arc<dyn RemoteData>, cache: SearchCache, debounce: Duration) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            inner: Arc::new(Inner {
                remote,
                cache,
                debounce,
                state,
                pending: Mutex::new(None),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> SearchState {
        self.inner.state.borrow().clone()
    }

    /// Restart the debounce timer for `query`, cancelling any earlier
    /// pending or in-flight lookup.
    pub fn set_query(&self, query: impl Into<String>) {
        let query = query.into();
        let mut request = 0;
        self.inner.state.send_modify(|state| {
            state.request += 1;
            state.query = query.clone();
            request = state.request;
        });

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            inner.run(request, query).await;
        });

        let previous = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Returns the revision the delta was applied against, or `None` when
    /// the character is not in the current results.
    pub fn apply_optimistic_delta(&self, character_id: CharacterId, delta: i64) -> Option<Revision> {
        let mut applied = None;
        self.inner.state.send_if_modified(|state| {
            if adjust_votes(&mut state.characters, character_id, delta) {
                applied = Some(state.revision);
                true
            } else {
                false
            }
        });
        applied
    }

    /// Undo a delta unless the results were refetched since it was applied.
    pub fn revert_optimistic_delta(&self, character_id: CharacterId, delta: i64, revision: Revision) {
        self.inner.state.send_if_modified(|state| {
            state.revision == revision && adjust_votes(&mut state.characters, character_id, -delta)
        });
    }
}

impl Inner {
    async fn run(&self, request: u64, query: String) {
        let current = self.state.send_if_modified(|state| {
            if state.request != request {
                return false;
            }
            state.loading = true;
            state.error = None;
            true
        });
        if !current {
            return;
        }

        let outcome = lookup(self.remote.as_ref(), &self.cache, &query).await;

        self.state.send_if_modified(|state| {
            if state.request != request {
                return false;
            }
            state.loading = false;
            match outcome {
                Ok(characters) => {
                    state.characters = characters;
                    state.error = None;
                    state.revision += 1;
                }
                Err(e) => {
                    tracing::error!("Error fetching characters for {:?}: {}", query, e);
                    state.error = Some(e.to_string());
                }
            }
            true
        });
    }
}

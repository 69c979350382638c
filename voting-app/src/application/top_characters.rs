use super::ports::RemoteData;
use super::{adjust_votes, Revision};
use crate::domain::{Character, CharacterId};
use std::sync::Arc;
use tokio::sync::watch;

pub const TOP_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopState {
    pub characters: Vec<Character>,
    pub loading: bool,
    pub error: Option<String>,
    pub revision: Revision,
}

/// The leaderboard strip shown next to the search results.
#[derive(Clone)]
pub struct TopCharacters {
    remote: Arc<dyn RemoteData>,
    state: Arc<watch::Sender<TopState>>,
}

impl TopCharacters {
    pub fn new(remote: Arc<dyn RemoteData>) -> Self {
        let (state, _) = watch::channel(TopState::default());
        Self {
            remote,
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TopState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> TopState {
        self.state.borrow().clone()
    }

    /// Refetch the top entries. A failure keeps the previous list visible.
    pub async fn refresh(&self) {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let outcome = self.remote.top_by_votes(TOP_LIMIT).await;

        self.state.send_modify(|state| {
            state.loading = false;
            match outcome {
                Ok(characters) => {
                    state.characters = characters;
                    state.revision += 1;
                }
                Err(e) => {
                    tracing::error!("Error fetching top characters: {}", e);
                    state.error = Some(e.to_string());
                }
            }
        });
    }

    pub fn apply_optimistic_delta(&self, character_id: CharacterId, delta: i64) -> Option<Revision> {
        let mut applied = None;
        self.state.send_if_modified(|state| {
            if adjust_votes(&mut state.characters, character_id, delta) {
                applied = Some(state.revision);
                true
            } else {
                false
            }
        });
        applied
    }

    pub fn revert_optimistic_delta(&self, character_id: CharacterId, delta: i64, revision: Revision) {
        self.state.send_if_modified(|state| {
            state.revision == revision && adjust_votes(&mut state.characters, character_id, -delta)
        });
    }
}

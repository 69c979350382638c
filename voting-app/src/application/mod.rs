mod auth_session;
pub mod ports;
mod quota_tracker;
mod rankings;
mod search;
mod top_characters;
mod vote;
mod voting_client;

pub use auth_session::AuthSession;
pub use quota_tracker::{remaining_for, QuotaState, QuotaTracker};
pub use rankings::{Rankings, RANKINGS_LIMIT};
pub use search::{
    lookup, CharacterSearch, SearchState, DEFAULT_SEARCH_DEBOUNCE, LISTING_LIMIT,
    SEARCH_RESULT_LIMIT,
};
pub use top_characters::{TopCharacters, TopState, TOP_LIMIT};
pub use vote::{submit_vote, VoteOrchestrator, VotePhase, VoteState, DEFAULT_VOTE_TIMEOUT};
pub use voting_client::VotingClient;

use crate::domain::{Character, CharacterId};

/// Generation of a published character list; optimistic overlays are only
/// reverted against the generation they were applied to.
pub type Revision = u64;

fn adjust_votes(characters: &mut [Character], character_id: CharacterId, delta: i64) -> bool {
    match characters.iter_mut().find(|c| c.id == character_id) {
        Some(character) => {
            character.apply_vote_delta(delta);
            true
        }
        None => false,
    }
}

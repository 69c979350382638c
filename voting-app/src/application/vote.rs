use super::ports::{AuthService, RemoteData};
use super::{CharacterSearch, QuotaTracker, Revision, TopCharacters};
use crate::domain::{CharacterId, Identity};
use crate::infrastructure::cache::SearchCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use voting_errors::AppError;

pub const DEFAULT_VOTE_TIMEOUT: Duration = Duration::from_secs(15);

/// Call the hosted vote procedure and turn every kind of refusal into an
/// error. The call itself is never cancelled, only bounded by `limit`.
pub async fn submit_vote(
    remote: &dyn RemoteData,
    identity: &Identity,
    character_id: CharacterId,
    limit: Duration,
) -> Result<(), AppError> {
    match tokio::time::timeout(limit, remote.increment_vote(identity, character_id)).await {
        Err(_) => Err(AppError::Timeout),
        Ok(Err(e)) => Err(e),
        Ok(Ok(receipt)) if receipt.success => Ok(()),
        Ok(Ok(receipt)) => Err(AppError::RemoteCallFailed(
            receipt.error.unwrap_or_default(),
        )),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VotePhase {
    #[default]
    Idle,
    Voting(CharacterId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteState {
    pub phase: VotePhase,
    /// Message for the last vote that failed after it was accepted.
    pub last_error: Option<String>,
}

/// One optimistic change and what undoing it needs.
#[derive(Debug, Clone, Copy)]
enum Compensation {
    Search(Revision),
    TopCharacters(Revision),
    Quota(Revision),
}

#[derive(Debug)]
struct OptimisticVote {
    character_id: CharacterId,
    compensations: Vec<Compensation>,
}

struct Inner {
    auth: Arc<dyn AuthService>,
    remote: Arc<dyn RemoteData>,
    cache: SearchCache,
    search: CharacterSearch,
    top: TopCharacters,
    quota: QuotaTracker,
    timeout: Duration,
    state: watch::Sender<VoteState>,
}

/// Casts votes with instant local feedback and exact rollback.
///
/// Only one vote runs at a time; a second `vote` while one is in flight is
/// refused with [`AppError::VoteInProgress`] and touches nothing.
#[derive(Clone)]
pub struct VoteOrchestrator {
    inner: Arc<Inner>,
}

impl VoteOrchestrator {
    pub fn new(
        auth: Arc<dyn AuthService>,
        remote: Arc<dyn RemoteData>,
        cache: SearchCache,
        search: CharacterSearch,
        top: TopCharacters,
        quota: QuotaTracker,
        timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(VoteState::default());
        Self {
            inner: Arc::new(Inner {
                auth,
                remote,
                cache,
                search,
                top,
                quota,
                timeout,
                state,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<VoteState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> VoteState {
        self.inner.state.borrow().clone()
    }

    pub async fn vote(&self, character_id: CharacterId) -> Result<(), AppError> {
        let identity = self
            .inner
            .auth
            .current_identity()
            .ok_or(AppError::NotAuthenticated)?;

        if self.inner.quota.remaining() == 0 {
            return Err(AppError::QuotaExhausted);
        }

        let acquired = self.inner.state.send_if_modified(|state| {
            if state.phase != VotePhase::Idle {
                return false;
            }
            state.phase = VotePhase::Voting(character_id);
            state.last_error = None;
            true
        });
        if !acquired {
            return Err(AppError::VoteInProgress);
        }

        // Detached so that dropping this future cannot strand the
        // optimistic overlay or the in-flight flag.
        let inner = Arc::clone(&self.inner);
        match tokio::spawn(async move { inner.cast(identity, character_id).await }).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Vote task for {} aborted: {}", character_id, e);
                self.inner.finish(Some(AppError::Internal(e.to_string())));
                Err(AppError::Internal(format!("Vote task failed: {e}")))
            }
        }
    }
}

impl Inner {
    async fn cast(&self, identity: Identity, character_id: CharacterId) -> Result<(), AppError> {
        let Some(optimistic) = self.apply_optimistic(character_id) else {
            tracing::debug!("Quota ran out before the vote for {} started", character_id);
            self.finish(Some(AppError::QuotaExhausted));
            return Err(AppError::QuotaExhausted);
        };

        match submit_vote(self.remote.as_ref(), &identity, character_id, self.timeout).await {
            Ok(()) => {
                tracing::info!("Vote for {} counted", character_id);
                self.cache.invalidate_all();
                self.top.refresh().await;
                self.finish(None);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Vote for {} failed, rolling back: {}", character_id, e);
                self.rollback(optimistic);
                self.finish(Some(e.clone()));
                Err(e)
            }
        }
    }

    /// -1 on the quota, then +1 on every visible copy of the character.
    /// `None` when the quota is already spent; nothing is changed then.
    fn apply_optimistic(&self, character_id: CharacterId) -> Option<OptimisticVote> {
        let quota = self.quota.apply_optimistic_delta(-1)?;

        let mut compensations = vec![Compensation::Quota(quota)];
        if let Some(revision) = self.search.apply_optimistic_delta(character_id, 1) {
            compensations.push(Compensation::Search(revision));
        }
        if let Some(revision) = self.top.apply_optimistic_delta(character_id, 1) {
            compensations.push(Compensation::TopCharacters(revision));
        }

        Some(OptimisticVote {
            character_id,
            compensations,
        })
    }

    fn rollback(&self, vote: OptimisticVote) {
        for compensation in vote.compensations {
            match compensation {
                Compensation::Search(revision) => {
                    self.search
                        .revert_optimistic_delta(vote.character_id, 1, revision)
                }
                Compensation::TopCharacters(revision) => {
                    self.top.revert_optimistic_delta(vote.character_id, 1, revision)
                }
                Compensation::Quota(revision) => self.quota.revert_optimistic_delta(-1, revision),
            }
        }
    }

    fn finish(&self, error: Option<AppError>) {
        self.state.send_modify(|state| {
            state.phase = VotePhase::Idle;
            state.last_error = error.map(|e| e.user_message().to_string());
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::DEFAULT_SEARCH_DEBOUNCE;
    use crate::domain::{Character, VoteReceipt};
    use crate::test_support::{crew, FakeRemote, StaticAuth};

    struct Harness {
        remote: Arc<FakeRemote>,
        cache: SearchCache,
        search: CharacterSearch,
        top: TopCharacters,
        quota: QuotaTracker,
        votes: VoteOrchestrator,
    }

    impl Harness {
        fn search_votes(&self, id: i64) -> Option<u32> {
            self.search
                .snapshot()
                .characters
                .iter()
                .find(|c| c.id == CharacterId(id))
                .map(|c| c.votes)
        }

        fn top_votes(&self, id: i64) -> Option<u32> {
            self.top
                .snapshot()
                .characters
                .iter()
                .find(|c| c.id == CharacterId(id))
                .map(|c| c.votes)
        }
    }

    async fn harness(characters: Vec<Character>, votes_cast_today: u32, auth: StaticAuth) -> Harness {
        let remote = Arc::new(FakeRemote::with_characters(characters));
        remote.set_votes_cast_today(votes_cast_today);
        let auth: Arc<dyn AuthService> = Arc::new(auth);
        let cache = SearchCache::default();

        let search = CharacterSearch::new(remote.clone(), cache.clone(), DEFAULT_SEARCH_DEBOUNCE);
        let top = TopCharacters::new(remote.clone());
        let quota = QuotaTracker::new(remote.clone(), auth.clone());

        search.set_query("");
        tokio::time::sleep(DEFAULT_SEARCH_DEBOUNCE + Duration::from_millis(10)).await;
        top.refresh().await;
        quota.fetch().await;

        let votes = VoteOrchestrator::new(
            auth,
            remote.clone(),
            cache.clone(),
            search.clone(),
            top.clone(),
            quota.clone(),
            DEFAULT_VOTE_TIMEOUT,
        );

        Harness {
            remote,
            cache,
            search,
            top,
            quota,
            votes,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_vote_rolls_back_exactly() {
        let h = harness(crew(), 4, StaticAuth::signed_in()).await;
        h.remote.reply_to_votes_with(Ok(VoteReceipt::rejected("already voted")));
        h.remote.delay_votes(Duration::from_secs(1));

        let votes = h.votes.clone();
        let pending = tokio::spawn(async move { votes.vote(CharacterId(42)).await });
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(h.search_votes(42), Some(11));
        assert_eq!(h.top_votes(42), Some(11));
        assert_eq!(h.quota.remaining(), 0);
        assert_eq!(h.votes.snapshot().phase, VotePhase::Voting(CharacterId(42)));

        let result = pending.await.unwrap();
        assert_eq!(
            result,
            Err(AppError::RemoteCallFailed("already voted".to_string()))
        );
        assert_eq!(h.search_votes(42), Some(10));
        assert_eq!(h.top_votes(42), Some(10));
        assert_eq!(h.quota.remaining(), 1);

        let state = h.votes.snapshot();
        assert_eq!(state.phase, VotePhase::Idle);
        assert_eq!(state.last_error.as_deref(), Some("already voted"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_quota_makes_no_remote_call() {
        let h = harness(crew(), 5, StaticAuth::signed_in()).await;
        let before = h.search.snapshot();

        assert_eq!(h.votes.vote(CharacterId(1)).await, Err(AppError::QuotaExhausted));
        assert!(h.remote.calls_starting_with("vote:").is_empty());
        assert_eq!(h.search.snapshot(), before);
        assert_eq!(h.quota.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_refetched_to_zero_before_vote_starts() {
        let h = harness(crew(), 4, StaticAuth::signed_in()).await;
        h.remote.reply_to_votes_with(Ok(VoteReceipt::rejected("already voted")));
        assert_eq!(h.quota.remaining(), 1);

        h.remote.set_votes_cast_today(5);
        let quota = h.quota.clone();
        let refetch = tokio::spawn(async move { quota.fetch().await });

        let result = h.votes.vote(CharacterId(42)).await;
        refetch.await.unwrap();

        assert_eq!(result, Err(AppError::QuotaExhausted));
        assert!(h.remote.calls_starting_with("vote:").is_empty());
        assert_eq!(h.quota.remaining(), 0);
        assert_eq!(h.search_votes(42), Some(10));
        assert_eq!(h.top_votes(42), Some(10));
        assert_eq!(h.votes.snapshot().phase, VotePhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signed_out_makes_no_remote_call() {
        let h = harness(crew(), 0, StaticAuth::signed_out()).await;

        assert_eq!(h.votes.vote(CharacterId(1)).await, Err(AppError::NotAuthenticated));
        assert!(h.remote.calls_starting_with("vote:").is_empty());
        assert_eq!(h.search_votes(1), Some(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_counted_vote_invalidates_cache_and_reconciles_top() {
        let characters = vec![
            Character::new(1, "Monkey D. Luffy", 120),
            Character::new(2, "Roronoa Zoro", 95),
            Character::new(5, "Sanji", 94),
        ];
        let h = harness(characters, 0, StaticAuth::signed_in()).await;
        h.cache.put("sanji", vec![Character::new(5, "Sanji", 94)]);

        h.votes.vote(CharacterId(5)).await.unwrap();
        assert!(h.cache.is_empty());
        h.votes.vote(CharacterId(5)).await.unwrap();

        let top: Vec<(i64, u32)> = h
            .top
            .snapshot()
            .characters
            .iter()
            .map(|c| (c.id.0, c.votes))
            .collect();
        assert_eq!(top, vec![(1, 120), (5, 96), (2, 95)]);
        assert_eq!(h.remote.votes_of(5), 96);
        assert_eq!(h.search_votes(5), Some(96));
        assert_eq!(h.quota.remaining(), 3);
        assert_eq!(h.votes.snapshot().last_error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let h = harness(crew(), 0, StaticAuth::signed_in()).await;
        h.remote.delay_votes(DEFAULT_VOTE_TIMEOUT + Duration::from_secs(5));

        assert_eq!(h.votes.vote(CharacterId(3)).await, Err(AppError::Timeout));
        assert_eq!(h.search_votes(3), Some(60));
        assert_eq!(h.top_votes(3), Some(60));
        assert_eq!(h.quota.remaining(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_uses_generic_message() {
        let h = harness(crew(), 0, StaticAuth::signed_in()).await;
        h.remote
            .reply_to_votes_with(Err(AppError::RemoteCallFailed(String::new())));

        assert!(h.votes.vote(CharacterId(2)).await.is_err());
        assert_eq!(h.votes.snapshot().last_error.as_deref(), Some("Failed to vote."));
        assert_eq!(h.search_votes(2), Some(95));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_vote_while_in_flight_is_refused() {
        let h = harness(crew(), 0, StaticAuth::signed_in()).await;
        h.remote.delay_votes(Duration::from_secs(1));

        let votes = h.votes.clone();
        let first = tokio::spawn(async move { votes.vote(CharacterId(1)).await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(h.votes.vote(CharacterId(2)).await, Err(AppError::VoteInProgress));
        assert_eq!(h.search_votes(2), Some(95));

        first.await.unwrap().unwrap();
        assert_eq!(h.remote.calls_starting_with("vote:"), vec!["vote:1"]);
        assert_eq!(h.quota.remaining(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_votes_never_push_counts_below_zero() {
        let h = harness(vec![Character::new(7, "Pandaman", 0)], 0, StaticAuth::signed_in()).await;
        h.remote.reply_to_votes_with(Ok(VoteReceipt::rejected("closed")));

        for _ in 0..5 {
            assert!(h.votes.vote(CharacterId(7)).await.is_err());
            assert_eq!(h.search_votes(7), Some(0));
            assert_eq!(h.top_votes(7), Some(0));
        }
        assert_eq!(h.quota.remaining(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_vote_for_character_not_on_screen_only_moves_quota() {
        let h = harness(crew()[..2].to_vec(), 0, StaticAuth::signed_in()).await;
        h.remote.reply_to_votes_with(Ok(VoteReceipt::rejected("unknown character")));

        assert!(h.votes.vote(CharacterId(999)).await.is_err());
        assert_eq!(h.quota.remaining(), 5);
        assert_eq!(h.search_votes(1), Some(120));
    }
}

use super::ports::{AuthProvider, AuthService, RemoteData};
use super::{AuthSession, CharacterSearch, QuotaTracker, TopCharacters, VoteOrchestrator};
use crate::config::AppConfig;
use crate::domain::AccessToken;
use crate::infrastructure::cache::SearchCache;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

/// Everything one signed-in (or anonymous) visitor needs, wired together.
pub struct VotingClient {
    pub auth: Arc<AuthSession>,
    pub search: CharacterSearch,
    pub top: TopCharacters,
    pub quota: QuotaTracker,
    pub votes: VoteOrchestrator,
    quota_follower: Mutex<Option<JoinHandle<()>>>,
}

impl VotingClient {
    pub fn new(
        remote: Arc<dyn RemoteData>,
        provider: Arc<dyn AuthProvider>,
        cache: SearchCache,
        config: &AppConfig,
    ) -> Self {
        let auth = Arc::new(AuthSession::new(provider));
        let auth_service: Arc<dyn AuthService> = auth.clone();

        let search = CharacterSearch::new(remote.clone(), cache.clone(), config.search_debounce);
        let top = TopCharacters::new(remote.clone());
        let quota = QuotaTracker::new(remote.clone(), auth_service.clone());
        let votes = VoteOrchestrator::new(
            auth_service,
            remote,
            cache,
            search.clone(),
            top.clone(),
            quota.clone(),
            config.vote_timeout,
        );

        Self {
            auth,
            search,
            top,
            quota,
            votes,
            quota_follower: Mutex::new(None),
        }
    }

    /// Restore the session, then load the default listing, the leaderboard
    /// and the quota.
    pub async fn start(&self, stored: Option<AccessToken>) {
        self.auth.init(stored).await;

        let follower = self.quota.follow_identity();
        if let Some(previous) = self
            .quota_follower
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(follower)
        {
            previous.abort();
        }

        self.search.set_query("");
        self.top.refresh().await;
    }

    pub fn dispose(&self) {
        self.auth.dispose();
        if let Some(follower) = self
            .quota_follower
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            follower.abort();
        }
    }
}

impl Drop for VotingClient {
    fn drop(&mut self) {
        self.dispose();
    }
}

use super::ports::{AuthService, RemoteData};
use super::Revision;
use crate::domain::{DailyQuota, Identity, DAILY_VOTE_ALLOWANCE};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Today's quota for `identity`.
///
/// A failed count lookup grants the full allowance: the hosted procedure
/// enforces the real limit, so a transient read error must not block voting.
pub async fn remaining_for(
    remote: &dyn RemoteData,
    identity: Option<&Identity>,
    date: NaiveDate,
) -> DailyQuota {
    let Some(identity) = identity else {
        return DailyQuota::signed_out();
    };

    match remote.daily_vote_count(identity, date).await {
        Ok(count) => DailyQuota::from_votes_cast(identity.id, count),
        Err(e) => {
            tracing::warn!("Error fetching votes remaining for {}: {}", identity.id, e);
            DailyQuota::full(identity.id)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaState {
    pub quota: DailyQuota,
    pub loaded: bool,
    pub revision: Revision,
}

impl Default for QuotaState {
    fn default() -> Self {
        Self {
            quota: DailyQuota::signed_out(),
            loaded: false,
            revision: 0,
        }
    }
}

#[derive(Clone)]
pub struct QuotaTracker {
    remote: Arc<dyn RemoteData>,
    auth: Arc<dyn AuthService>,
    state: Arc<watch::Sender<QuotaState>>,
}

impl QuotaTracker {
    pub fn new(remote: Arc<dyn RemoteData>, auth: Arc<dyn AuthService>) -> Self {
        let (state, _) = watch::channel(QuotaState::default());
        Self {
            remote,
            auth,
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<QuotaState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> QuotaState {
        *self.state.borrow()
    }

    pub fn remaining(&self) -> u8 {
        self.state.borrow().quota.remaining
    }

    pub async fn fetch(&self) {
        let identity = self.auth.current_identity();
        let quota = remaining_for(
            self.remote.as_ref(),
            identity.as_ref(),
            Utc::now().date_naive(),
        )
        .await;

        self.state.send_modify(|state| {
            state.quota = quota;
            state.loaded = true;
            state.revision += 1;
        });
    }

    /// Returns the revision the delta was applied against, or `None` when
    /// the delta would leave `[0, DAILY_VOTE_ALLOWANCE]`; the quota is then
    /// left untouched.
    pub fn apply_optimistic_delta(&self, delta: i8) -> Option<Revision> {
        let mut applied = None;
        self.state.send_if_modified(|state| {
            let target = i16::from(state.quota.remaining) + i16::from(delta);
            if !(0..=i16::from(DAILY_VOTE_ALLOWANCE)).contains(&target) {
                return false;
            }
            state.quota.apply_delta(delta);
            applied = Some(state.revision);
            true
        });
        applied
    }

    /// Undo a delta unless the quota was refetched since it was applied.
    pub fn revert_optimistic_delta(&self, delta: i8, revision: Revision) {
        self.state.send_if_modified(|state| {
            if state.revision != revision {
                return false;
            }
            state.quota.apply_delta(-delta);
            true
        });
    }

    /// Fetch now and again on every sign-in or sign-out.
    pub fn follow_identity(&self) -> JoinHandle<()> {
        let tracker = self.clone();
        let mut changes = self.auth.subscribe();
        tokio::spawn(async move {
            tracker.fetch().await;
            while changes.changed().await.is_ok() {
                let signed_in = changes.borrow_and_update().is_some();
                tracing::debug!("Identity changed (signed in: {}), refetching quota", signed_in);
                tracker.fetch().await;
            }
        })
    }
}

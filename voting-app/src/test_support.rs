//! In-memory collaborators for unit tests.

use crate::application::ports::{
    AuthProvider, AuthService, AuthorizeRequest, CodeVerifier, RemoteData,
};
use crate::domain::{AccessToken, Character, CharacterId, Identity, VoteReceipt};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;
use voting_errors::AppError;

pub fn identity() -> Identity {
    Identity::new(
        uuid::Uuid::from_u128(0x5eed),
        Some("luffy@example.com".to_string()),
        AccessToken::new("valid"),
    )
}

pub fn crew() -> Vec<Character> {
    vec![
        Character::new(1, "Monkey D. Luffy", 120),
        Character::new(2, "Roronoa Zoro", 95),
        Character::new(3, "Nami", 60),
        Character::new(4, "Usopp", 40),
        Character::new(5, "Sanji", 88),
        Character::new(42, "Nico Robin", 10),
    ]
}

/// A hosted database that keeps its rows in memory and records every call.
#[derive(Default)]
pub struct FakeRemote {
    characters: Mutex<Vec<Character>>,
    calls: Mutex<Vec<String>>,
    votes_cast_today: Mutex<u32>,
    vote_reply: Mutex<Option<Result<VoteReceipt, AppError>>>,
    vote_delay: Mutex<Option<Duration>>,
    read_delay: Mutex<Option<Duration>>,
    fail_reads: AtomicBool,
    fail_quota: AtomicBool,
}

impl FakeRemote {
    pub fn with_characters(characters: Vec<Character>) -> Self {
        let remote = Self::default();
        *remote.characters.lock().unwrap() = characters;
        remote
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    pub fn votes_of(&self, id: i64) -> u32 {
        self.characters
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == CharacterId(id))
            .map(|c| c.votes)
            .unwrap_or(0)
    }

    pub fn set_votes_cast_today(&self, count: u32) {
        *self.votes_cast_today.lock().unwrap() = count;
    }

    /// Fixed reply for `increment_vote`; the stored rows stay untouched.
    pub fn reply_to_votes_with(&self, reply: Result<VoteReceipt, AppError>) {
        *self.vote_reply.lock().unwrap() = Some(reply);
    }

    pub fn delay_votes(&self, delay: Duration) {
        *self.vote_delay.lock().unwrap() = Some(delay);
    }

    /// Character reads are recorded at once and answered after `delay`.
    pub fn delay_reads(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_quota(&self, fail: bool) {
        self.fail_quota.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn read_guard(&self) -> Result<(), AppError> {
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::RemoteCallFailed("connection reset".to_string()));
        }
        Ok(())
    }

    fn sorted_by_votes(&self) -> Vec<Character> {
        let mut characters = self.characters.lock().unwrap().clone();
        characters.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.name.cmp(&b.name)));
        characters
    }
}

#[async_trait]
impl RemoteData for FakeRemote {
    async fn search_ranked(&self, term: &str, limit: usize) -> Result<Vec<Character>, AppError> {
        self.record(format!("search:{term}"));
        self.read_guard().await?;
        let term = term.to_lowercase();
        Ok(self
            .characters
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&term))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_alphabetical(&self, limit: usize) -> Result<Vec<Character>, AppError> {
        self.record("list".to_string());
        self.read_guard().await?;
        let mut characters = self.characters.lock().unwrap().clone();
        characters.sort_by(|a, b| a.name.cmp(&b.name));
        characters.truncate(limit);
        Ok(characters)
    }

    async fn top_by_votes(&self, limit: usize) -> Result<Vec<Character>, AppError> {
        self.record("top".to_string());
        self.read_guard().await?;
        let mut characters = self.sorted_by_votes();
        characters.truncate(limit);
        Ok(characters)
    }

    async fn rankings(&self, limit: usize) -> Result<Vec<Character>, AppError> {
        self.record("rankings".to_string());
        self.read_guard().await?;
        let mut characters = self.sorted_by_votes();
        characters.truncate(limit);
        Ok(characters)
    }

    async fn daily_vote_count(
        &self,
        _identity: &Identity,
        _date: NaiveDate,
    ) -> Result<u32, AppError> {
        self.record("quota".to_string());
        if self.fail_quota.load(Ordering::SeqCst) {
            return Err(AppError::RemoteCallFailed("quota lookup failed".to_string()));
        }
        Ok(*self.votes_cast_today.lock().unwrap())
    }

    async fn increment_vote(
        &self,
        _identity: &Identity,
        character_id: CharacterId,
    ) -> Result<VoteReceipt, AppError> {
        self.record(format!("vote:{character_id}"));
        let delay = *self.vote_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(reply) = self.vote_reply.lock().unwrap().clone() {
            return reply;
        }

        let mut characters = self.characters.lock().unwrap();
        match characters.iter_mut().find(|c| c.id == character_id) {
            Some(character) => {
                character.votes += 1;
                *self.votes_cast_today.lock().unwrap() += 1;
                Ok(VoteReceipt::counted())
            }
            None => Ok(VoteReceipt::rejected("Character not found")),
        }
    }
}

/// Auth port whose identity is set directly by the test.
pub struct StaticAuth {
    identity: watch::Sender<Option<Identity>>,
}

impl StaticAuth {
    pub fn signed_in() -> Self {
        let (identity, _) = watch::channel(Some(identity()));
        Self { identity }
    }

    pub fn signed_out() -> Self {
        let (identity, _) = watch::channel(None);
        Self { identity }
    }

    pub fn set(&self, identity: Option<Identity>) {
        self.identity.send_replace(identity);
    }
}

impl AuthService for StaticAuth {
    fn current_identity(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }
}

/// Accepts the code `good-code` and the token `valid`.
#[derive(Default)]
pub struct FakeAuthProvider {
    fail_sign_out: AtomicBool,
}

impl FakeAuthProvider {
    pub fn fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuthProvider for FakeAuthProvider {
    fn authorize(&self, redirect_to: &str) -> Result<AuthorizeRequest, AppError> {
        Ok(AuthorizeRequest {
            url: format!("https://auth.example.com/authorize?redirect_to={redirect_to}"),
            verifier: CodeVerifier::new("verifier"),
        })
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &CodeVerifier,
    ) -> Result<Identity, AppError> {
        if code == "good-code" && verifier.secret() == "verifier" {
            Ok(identity())
        } else {
            Err(AppError::RemoteCallFailed("invalid grant".to_string()))
        }
    }

    async fn identity_for_token(&self, token: &AccessToken) -> Result<Identity, AppError> {
        if token.expose() == "valid" {
            Ok(identity())
        } else {
            Err(AppError::NotAuthenticated)
        }
    }

    async fn sign_out(&self, _identity: &Identity) -> Result<(), AppError> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AppError::RemoteCallFailed("logout failed".to_string()));
        }
        Ok(())
    }
}

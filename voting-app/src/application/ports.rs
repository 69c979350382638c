use crate::domain::{AccessToken, Character, CharacterId, Identity, VoteReceipt};
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::watch;
use voting_errors::AppError;

/// The hosted database. Ranking order and daily-limit enforcement live
/// behind this trait.
#[async_trait]
pub trait RemoteData: Send + Sync {
    /// Full-text search ranked by the server.
    async fn search_ranked(&self, term: &str, limit: usize) -> Result<Vec<Character>, AppError>;

    async fn list_alphabetical(&self, limit: usize) -> Result<Vec<Character>, AppError>;

    async fn top_by_votes(&self, limit: usize) -> Result<Vec<Character>, AppError>;

    /// Votes descending, then name ascending.
    async fn rankings(&self, limit: usize) -> Result<Vec<Character>, AppError>;

    async fn daily_vote_count(
        &self,
        identity: &Identity,
        date: NaiveDate,
    ) -> Result<u32, AppError>;

    /// Runs the hosted `increment_votes` procedure as `identity`.
    async fn increment_vote(
        &self,
        identity: &Identity,
        character_id: CharacterId,
    ) -> Result<VoteReceipt, AppError>;
}

/// PKCE verifier kept between the authorize redirect and the code exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct CodeVerifier(String);

impl CodeVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for CodeVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CodeVerifier(..)")
    }
}

#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub url: String,
    pub verifier: CodeVerifier,
}

/// Stateless operations of the managed auth provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    fn authorize(&self, redirect_to: &str) -> Result<AuthorizeRequest, AppError>;

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &CodeVerifier,
    ) -> Result<Identity, AppError>;

    async fn identity_for_token(&self, token: &AccessToken) -> Result<Identity, AppError>;

    async fn sign_out(&self, identity: &Identity) -> Result<(), AppError>;
}

/// Who is signed in right now, and a feed of changes.
pub trait AuthService: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;

    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;
}

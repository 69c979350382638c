use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct SearchRankedParams<'a> {
    pub search_term: &'a str,
    pub result_limit: usize,
}

#[derive(Debug, Serialize)]
pub struct IncrementVotesParams {
    pub character_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct DailyVoteRow {
    #[serde(default)]
    pub vote_count: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PkceTokenRequest<'a> {
    pub auth_code: &'a str,
    pub code_verifier: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize)]
pub struct UserResponse {
    pub id: uuid::Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Error body shared by PostgREST (`message`) and GoTrue (`msg`,
/// `error_description`).
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.msg).or(self.error_description)
    }
}

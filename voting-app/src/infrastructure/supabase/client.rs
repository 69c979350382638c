use super::types::{DailyVoteRow, ErrorBody, IncrementVotesParams, SearchRankedParams};
use crate::application::ports::RemoteData;
use crate::config::AppConfig;
use crate::domain::{Character, CharacterId, Identity, VoteReceipt};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;
use voting_errors::AppError;

const CHARACTERS_TABLE: &str = "one_piece_characters";
const DAILY_VOTES_TABLE: &str = "user_daily_votes";
const SEARCH_FUNCTION: &str = "search_characters_ranked";
const VOTE_FUNCTION: &str = "increment_votes";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// PostgREST/GoTrue client for a hosted Supabase project.
#[derive(Clone)]
pub struct SupabaseClient {
    http_client: reqwest::Client,
    base_url: Url,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: Url, anon_key: impl Into<String>) -> Result<Self, AppError> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
            anon_key: anon_key.into(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Self::new(config.supabase_url.clone(), config.supabase_anon_key.clone())
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::InvalidConfig(format!("SUPABASE_URL: {}", e)))
    }

    /// Every call carries the project key; `bearer` selects the acting user.
    pub(crate) fn request(&self, method: Method, url: Url, bearer: Option<&str>) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
    }

    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, AppError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!("Supabase error: {} - {}", status, body);
        Err(AppError::RemoteCallFailed(error_message(status, &body)))
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, AppError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| AppError::RemoteCallFailed(e.to_string()))
    }

    fn characters_url(&self, order: &str, limit: usize) -> Result<Url, AppError> {
        let mut url = self.endpoint(&format!("/rest/v1/{CHARACTERS_TABLE}"))?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", order)
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }

    fn daily_votes_url(&self, identity: &Identity, date: NaiveDate) -> Result<Url, AppError> {
        let mut url = self.endpoint(&format!("/rest/v1/{DAILY_VOTES_TABLE}"))?;
        url.query_pairs_mut()
            .append_pair("select", "vote_count")
            .append_pair("user_id", &format!("eq.{}", identity.id))
            .append_pair("vote_date", &format!("eq.{}", date.format("%Y-%m-%d")));
        Ok(url)
    }

    async fn select_characters(&self, order: &str, limit: usize) -> Result<Vec<Character>, AppError> {
        let url = self.characters_url(order, limit)?;
        self.send_json(self.request(Method::GET, url, None)).await
    }
}

#[async_trait]
impl RemoteData for SupabaseClient {
    async fn search_ranked(&self, term: &str, limit: usize) -> Result<Vec<Character>, AppError> {
        let url = self.endpoint(&format!("/rest/v1/rpc/{SEARCH_FUNCTION}"))?;
        let params = SearchRankedParams {
            search_term: term,
            result_limit: limit,
        };
        let characters: Option<Vec<Character>> = self
            .send_json(self.request(Method::POST, url, None).json(&params))
            .await?;
        Ok(characters.unwrap_or_default())
    }

    async fn list_alphabetical(&self, limit: usize) -> Result<Vec<Character>, AppError> {
        self.select_characters("name.asc", limit).await
    }

    async fn top_by_votes(&self, limit: usize) -> Result<Vec<Character>, AppError> {
        self.select_characters("votes.desc", limit).await
    }

    async fn rankings(&self, limit: usize) -> Result<Vec<Character>, AppError> {
        self.select_characters("votes.desc,name.asc", limit).await
    }

    async fn daily_vote_count(
        &self,
        identity: &Identity,
        date: NaiveDate,
    ) -> Result<u32, AppError> {
        let url = self.daily_votes_url(identity, date)?;
        let rows: Vec<DailyVoteRow> = self
            .send_json(self.request(
                Method::GET,
                url,
                Some(identity.access_token.expose()),
            ))
            .await?;
        Ok(rows.first().and_then(|r| r.vote_count).unwrap_or(0))
    }

    async fn increment_vote(
        &self,
        identity: &Identity,
        character_id: CharacterId,
    ) -> Result<VoteReceipt, AppError> {
        let url = self.endpoint(&format!("/rest/v1/rpc/{VOTE_FUNCTION}"))?;
        let params = IncrementVotesParams {
            character_id: character_id.0,
        };
        self.send_json(
            self.request(Method::POST, url, Some(identity.access_token.expose()))
                .json(&params),
        )
        .await
    }
}

fn transport_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::Timeout
    } else {
        AppError::RemoteCallFailed(e.to_string())
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| format!("API error: {}", status))
}

use crate::application::{DEFAULT_SEARCH_DEBOUNCE, DEFAULT_VOTE_TIMEOUT};
use crate::infrastructure::cache::SEARCH_CACHE_TTL;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use url::Url;
use voting_errors::AppError;

const DEFAULT_SITE_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: Url,
    pub supabase_anon_key: String,
    /// Public origin, used for the OAuth redirect back to `/auth/callback`.
    pub site_url: Url,
    pub listen_addr: String,
    pub search_debounce: Duration,
    pub vote_timeout: Duration,
    pub search_cache_ttl: Duration,
    pub search_cache_enabled: bool,
}

impl AppConfig {
    pub fn new(supabase_url: Url, supabase_anon_key: impl Into<String>) -> Self {
        Self {
            supabase_url,
            supabase_anon_key: supabase_anon_key.into(),
            site_url: Url::parse(DEFAULT_SITE_URL).expect("default site url is valid"),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            vote_timeout: DEFAULT_VOTE_TIMEOUT,
            search_cache_ttl: SEARCH_CACHE_TTL,
            search_cache_enabled: true,
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::InvalidConfig(format!("{key} must be set")))
        };

        let supabase_url = parse_url("SUPABASE_URL", &required("SUPABASE_URL")?)?;
        let mut config = Self::new(supabase_url, required("SUPABASE_ANON_KEY")?);

        if let Some(site_url) = lookup("SITE_URL") {
            config.site_url = parse_url("SITE_URL", &site_url)?;
        }
        if let Some(addr) = lookup("LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(ms) = parse_optional::<u64>(&lookup, "SEARCH_DEBOUNCE_MS")? {
            config.search_debounce = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_optional::<u64>(&lookup, "VOTE_TIMEOUT_SECS")? {
            config.vote_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_optional::<u64>(&lookup, "SEARCH_CACHE_TTL_SECS")? {
            config.search_cache_ttl = Duration::from_secs(secs);
        }
        if let Some(enabled) = parse_optional::<bool>(&lookup, "SEARCH_CACHE_ENABLED")? {
            config.search_cache_enabled = enabled;
        }

        Ok(config)
    }
}

fn parse_url(key: &str, value: &str) -> Result<Url, AppError> {
    Url::parse(value.trim()).map_err(|e| AppError::InvalidConfig(format!("{key}: {e}")))
}

fn parse_optional<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AppError::InvalidConfig(format!("{key}: {e}"))),
        None => {
            tracing::debug!("{} not set, using default", key);
            Ok(None)
        }
    }
}

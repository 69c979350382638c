use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AppError {
    #[error("Must be logged in to vote")]
    NotAuthenticated,

    #[error("No votes left for today")]
    QuotaExhausted,

    #[error("A vote is already in progress")]
    VoteInProgress,

    #[error("Remote call failed: {0}")]
    RemoteCallFailed(String),

    #[error("Search cache unavailable")]
    CacheUnavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FromStr for AppError {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("Must be logged in") {
            Ok(AppError::NotAuthenticated)
        } else if s.starts_with("No votes left") {
            Ok(AppError::QuotaExhausted)
        } else if s.starts_with("A vote is already") {
            Ok(AppError::VoteInProgress)
        } else if let Some(message) = s.strip_prefix("Remote call failed: ") {
            Ok(AppError::RemoteCallFailed(message.to_string()))
        } else if s.starts_with("Search cache unavailable") {
            Ok(AppError::CacheUnavailable)
        } else if s.to_lowercase().contains("timeout") {
            Ok(AppError::Timeout)
        } else if let Some(message) = s.strip_prefix("Invalid configuration: ") {
            Ok(AppError::InvalidConfig(message.to_string()))
        } else {
            Ok(AppError::Internal(s.to_string()))
        }
    }
}

impl AppError {
    /// Text shown inline next to the vote buttons or search box.
    ///
    /// A remote failure carries the message supplied by the hosted procedure
    /// ("already voted", ...) and is shown verbatim.
    pub fn user_message(&self) -> &str {
        match self {
            Self::NotAuthenticated => "Please sign in to vote!",
            Self::QuotaExhausted => "You've used all your votes for today!",
            Self::VoteInProgress => "Hold on, your last vote is still being counted.",
            Self::RemoteCallFailed(msg) if !msg.trim().is_empty() => msg,
            Self::RemoteCallFailed(_) => "Failed to vote.",
            Self::CacheUnavailable => "Search cache is unavailable.",
            Self::Timeout => "The request took too long. Try again.",
            Self::InvalidConfig(_) | Self::Internal(_) => "An unexpected error occurred.",
        }
    }
}

#[cfg(feature = "http")]
mod http_impl {
    use super::AppError;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::Json;

    #[derive(serde::Serialize)]
    struct ErrorResponse {
        message: String,
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = match &self {
                AppError::NotAuthenticated => StatusCode::UNAUTHORIZED,
                AppError::QuotaExhausted => StatusCode::TOO_MANY_REQUESTS,
                AppError::VoteInProgress => StatusCode::CONFLICT,
                AppError::RemoteCallFailed(_) => StatusCode::BAD_GATEWAY,
                AppError::CacheUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                AppError::InvalidConfig(_) | AppError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            let message = self.user_message().to_string();
            (status, Json(ErrorResponse { message })).into_response()
        }
    }
}

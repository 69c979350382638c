use serde::{Deserialize, Serialize};
use std::fmt;

/// Bearer token of a hosted auth session. Never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// The signed-in principal as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: uuid::Uuid,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub access_token: AccessToken,
}

impl Identity {
    pub fn new(id: uuid::Uuid, email: Option<String>, access_token: AccessToken) -> Self {
        Self {
            id,
            email,
            access_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_is_redacted() {
        let identity = Identity::new(
            uuid::Uuid::new_v4(),
            Some("nami@example.com".to_string()),
            AccessToken::new("secret-jwt"),
        );
        let debug = format!("{:?}", identity);
        assert!(!debug.contains("secret-jwt"));

        let json = serde_json::to_string(&identity).unwrap();
        assert!(!json.contains("secret-jwt"));
    }
}

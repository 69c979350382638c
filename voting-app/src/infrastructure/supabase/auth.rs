use super::client::SupabaseClient;
use super::types::{PkceTokenRequest, SessionResponse, UserResponse};
use crate::application::ports::{AuthProvider, AuthorizeRequest, CodeVerifier};
use crate::domain::{AccessToken, Identity};
use async_trait::async_trait;
use oauth2::PkceCodeChallenge;
use reqwest::Method;
use url::Url;
use voting_errors::AppError;

const OAUTH_PROVIDER: &str = "google";

/// Google sign-in through the hosted GoTrue endpoints, PKCE flow.
#[derive(Clone)]
pub struct SupabaseAuth {
    client: SupabaseClient,
}

impl SupabaseAuth {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    fn authorize_url(&self, redirect_to: &str, challenge: &str) -> Result<Url, AppError> {
        let mut url = self.client.endpoint("/auth/v1/authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", OAUTH_PROVIDER)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", challenge)
            .append_pair("code_challenge_method", "s256")
            .append_pair("prompt", "select_account");
        Ok(url)
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    fn authorize(&self, redirect_to: &str) -> Result<AuthorizeRequest, AppError> {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        let url = self.authorize_url(redirect_to, challenge.as_str())?;

        Ok(AuthorizeRequest {
            url: url.to_string(),
            verifier: CodeVerifier::new(verifier.secret().as_str()),
        })
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &CodeVerifier,
    ) -> Result<Identity, AppError> {
        let mut url = self.client.endpoint("/auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "pkce");

        let body = PkceTokenRequest {
            auth_code: code,
            code_verifier: verifier.secret(),
        };
        let session: SessionResponse = self
            .client
            .send_json(self.client.request(Method::POST, url, None).json(&body))
            .await?;

        tracing::info!("Signed in user {}", session.user.id);
        Ok(Identity::new(
            session.user.id,
            session.user.email,
            AccessToken::new(session.access_token),
        ))
    }

    async fn identity_for_token(&self, token: &AccessToken) -> Result<Identity, AppError> {
        let url = self.client.endpoint("/auth/v1/user")?;
        let user: UserResponse = self
            .client
            .send_json(self.client.request(Method::GET, url, Some(token.expose())))
            .await
            .map_err(|e| {
                tracing::debug!("Token rejected: {}", e);
                AppError::NotAuthenticated
            })?;

        Ok(Identity::new(user.id, user.email, token.clone()))
    }

    async fn sign_out(&self, identity: &Identity) -> Result<(), AppError> {
        let url = self.client.endpoint("/auth/v1/logout")?;
        self.client
            .send(self.client.request(
                Method::POST,
                url,
                Some(identity.access_token.expose()),
            ))
            .await?;
        Ok(())
    }
}

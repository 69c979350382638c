use super::ports::{AuthProvider, AuthService, CodeVerifier};
use crate::domain::{AccessToken, Identity};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use voting_errors::AppError;

/// Client-side session over an [`AuthProvider`].
///
/// Lifecycle: [`init`](Self::init) restores a stored session,
/// [`subscribe`](AuthService::subscribe) feeds identity changes to the
/// controllers, [`dispose`](Self::dispose) signs the session out locally and
/// refuses further sign-ins.
pub struct AuthSession {
    provider: Arc<dyn AuthProvider>,
    identity: watch::Sender<Option<Identity>>,
    pending_verifier: Mutex<Option<CodeVerifier>>,
    disposed: AtomicBool,
}

impl AuthSession {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            provider,
            identity,
            pending_verifier: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    pub async fn init(&self, stored: Option<AccessToken>) -> Option<Identity> {
        self.ensure_live().ok()?;

        let restored = match stored {
            Some(token) => match self.provider.identity_for_token(&token).await {
                Ok(identity) => Some(identity),
                Err(e) => {
                    tracing::warn!("Stored session rejected: {}", e);
                    None
                }
            },
            None => None,
        };

        self.identity.send_replace(restored.clone());
        restored
    }

    /// Returns the provider URL to send the browser to.
    pub fn sign_in(&self, redirect_to: &str) -> Result<String, AppError> {
        self.ensure_live()?;
        let request = self.provider.authorize(redirect_to)?;
        *self
            .pending_verifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(request.verifier);
        Ok(request.url)
    }

    pub async fn complete_sign_in(&self, code: &str) -> Result<Identity, AppError> {
        self.ensure_live()?;
        let verifier = self
            .pending_verifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| AppError::Internal("No sign-in in progress".to_string()))?;

        let identity = self.provider.exchange_code(code, &verifier).await?;
        tracing::info!("Signed in as {}", identity.id);
        self.identity.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    /// A failed remote sign-out keeps the local session.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        let Some(identity) = self.current_identity() else {
            return Ok(());
        };
        self.provider.sign_out(&identity).await?;
        tracing::info!("Signed out {}", identity.id);
        self.identity.send_replace(None);
        Ok(())
    }

    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.identity.send_replace(None);
        }
    }

    fn ensure_live(&self) -> Result<(), AppError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(AppError::Internal("Auth session disposed".to_string()));
        }
        Ok(())
    }
}

impl AuthService for AuthSession {
    fn current_identity(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }
}

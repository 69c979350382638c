use crate::application::ports::{AuthProvider, RemoteData};
use crate::application::VotingClient;
use crate::config::AppConfig;
use crate::infrastructure::cache::SearchCache;
use std::sync::Arc;
#[cfg(feature = "supabase")]
use voting_errors::AppError;

/// Process-wide handles shared by every visitor: the remote ports and the
/// search cache.
#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub remote: Arc<dyn RemoteData>,
    pub auth: Arc<dyn AuthProvider>,
    pub cache: SearchCache,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        remote: Arc<dyn RemoteData>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        let cache = if config.search_cache_enabled {
            SearchCache::new(config.search_cache_ttl)
        } else {
            tracing::info!("Search cache disabled");
            SearchCache::disabled()
        };

        Self {
            config,
            remote,
            auth,
            cache,
        }
    }

    #[cfg(feature = "supabase")]
    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        use crate::infrastructure::supabase::{SupabaseAuth, SupabaseClient};

        let client = SupabaseClient::from_config(&config)?;
        tracing::info!("Using Supabase project at {}", config.supabase_url);

        Ok(Self::new(
            config,
            Arc::new(client.clone()),
            Arc::new(SupabaseAuth::new(client)),
        ))
    }

    #[cfg(feature = "supabase")]
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_config(AppConfig::from_env()?)
    }

    /// A fresh per-visitor client sharing this context's ports and cache.
    pub fn client(&self) -> VotingClient {
        VotingClient::new(
            self.remote.clone(),
            self.auth.clone(),
            self.cache.clone(),
            &self.config,
        )
    }
}

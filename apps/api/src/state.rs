use crate::auth::TokenVerifier;
use crate::cache::service::DetailsService;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Cache pipeline over `Arc<dyn DetailStore>` and `Arc<dyn CandidateProvider>`.
    pub details: DetailsService,
    pub tokens: TokenVerifier,
}

#[cfg(test)]
pub fn test_state(
    store: std::sync::Arc<crate::cache::testing::MemoryDetailStore>,
    provider: std::sync::Arc<crate::cache::testing::ScriptedProvider>,
) -> AppState {
    use std::time::Duration;

    use crate::auth::test_tokens;
    use crate::cache::service::CacheSettings;

    let config = Config {
        database_url: "postgres://unused".to_string(),
        provider_base_url: "http://provider.invalid".to_string(),
        provider_api_key: None,
        jwt_secret: test_tokens::SECRET.to_string(),
        jwt_audience: None,
        cache_expiry: Duration::from_secs(24 * 60 * 60),
        provider_timeout: Duration::from_secs(5),
        max_batch_size: 100,
        port: 0,
        rust_log: "debug".to_string(),
    };
    let settings = CacheSettings::from_config(&config).unwrap();

    AppState {
        tokens: TokenVerifier::new(&config.jwt_secret, config.jwt_audience.as_deref()),
        details: DetailsService::new(store, provider, settings),
        config,
    }
}

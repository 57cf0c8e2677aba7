//! AppState construction extracted from `main.rs`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use aqm_domain::config::Config;
use aqm_geodata::{AirQualityAdapter, ArcGisClient, PlaceResolver, TtlCache};
use aqm_providers::retry::RetryPolicy;
use aqm_providers::util::{looks_like_openai_key, resolve_api_key};
use aqm_providers::{LlmProvider, OpenAiCompatProvider};

use crate::state::AppState;

/// Initialize every subsystem and return a fully-wired [`AppState`].
///
/// A missing or implausible API key is not fatal: the gateway still
/// serves, answering chat requests with a configuration-error reply.
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── LLM provider ─────────────────────────────────────────────────
    let llm: Option<Arc<dyn LlmProvider>> = match resolve_api_key(&config.llm) {
        Ok(key) if looks_like_openai_key(&key) => {
            let provider = OpenAiCompatProvider::new(&config.llm, key)
                .context("initializing LLM provider")?;
            tracing::info!(
                base_url = %config.llm.base_url,
                model = %config.llm.model,
                "LLM provider ready"
            );
            Some(Arc::new(provider))
        }
        Ok(_) => {
            tracing::warn!(
                env = %config.llm.api_key_env,
                "API key does not look like an OpenAI key, chat will answer degraded"
            );
            None
        }
        Err(_) => {
            tracing::warn!(
                env = %config.llm.api_key_env,
                "API key not set, chat will answer degraded"
            );
            None
        }
    };

    // ── Geodata adapter + caches ─────────────────────────────────────
    let client = Arc::new(
        ArcGisClient::new(&config.geodata).context("initializing feature-service client")?,
    );
    let geodata = Arc::new(AirQualityAdapter::new(client));
    tracing::info!(url = %config.geodata.feature_service_url, "feature-service client ready");

    let top_cache = Arc::new(TtlCache::new(Duration::from_secs(
        config.geodata.top_cache_ttl_secs,
    )));
    let place_cache = Arc::new(TtlCache::new(Duration::from_secs(
        config.geodata.place_cache_ttl_secs,
    )));

    Ok(AppState {
        retry: RetryPolicy::with_max_attempts(config.llm.max_attempts),
        config,
        llm,
        geodata,
        resolver: Arc::new(PlaceResolver::new()),
        top_cache,
        place_cache,
    })
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    /// Default-config state with no provider, for prompt-assembly tests.
    pub fn state_without_llm() -> AppState {
        let config = Arc::new(Config::default());
        let client =
            Arc::new(ArcGisClient::new(&config.geodata).unwrap());
        AppState {
            retry: RetryPolicy::with_max_attempts(config.llm.max_attempts),
            config,
            llm: None,
            geodata: Arc::new(AirQualityAdapter::new(client)),
            resolver: Arc::new(PlaceResolver::new()),
            top_cache: Arc::new(TtlCache::new(Duration::from_secs(60))),
            place_cache: Arc::new(TtlCache::new(Duration::from_secs(30))),
        }
    }
}

use std::sync::Arc;

use aqm_domain::config::Config;
use aqm_domain::place::{PlaceResult, RankedCity};
use aqm_geodata::{AirQualityAdapter, PlaceResolver, TtlCache};
use aqm_providers::retry::RetryPolicy;
use aqm_providers::LlmProvider;

/// Shared application state passed to all API handlers.
///
/// Both result caches are owned here and injected into the tool layer;
/// nothing below this struct holds global mutable state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// `None` when no plausible API key was found at boot. The chat
    /// endpoint answers with a configuration-error reply instead of
    /// attempting a completion.
    pub llm: Option<Arc<dyn LlmProvider>>,
    pub retry: RetryPolicy,

    pub geodata: Arc<AirQualityAdapter>,
    pub resolver: Arc<PlaceResolver>,

    /// Top-N ranking cache, keyed on the clamped limit.
    pub top_cache: Arc<TtlCache<String, Vec<RankedCity>>>,
    /// Per-place lookup cache, keyed on [`aqm_domain::place::PlaceQuery::cache_key`].
    pub place_cache: Arc<TtlCache<String, PlaceResult>>,
}

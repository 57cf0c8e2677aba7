use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Geodata feature service
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeodataConfig {
    /// Query endpoint of the PM2.5 feature layer (latest-hour OpenAQ
    /// results via the Living Atlas).
    #[serde(default = "d_feature_service_url")]
    pub feature_service_url: String,
    #[serde(default = "d_request_timeout")]
    pub request_timeout_secs: u64,
    /// TTL for the top-N ranking cache. The underlying data refreshes
    /// roughly hourly, so tens of seconds only collapses bursts.
    #[serde(default = "d_top_cache_ttl")]
    pub top_cache_ttl_secs: u64,
    /// TTL for the per-place lookup cache.
    #[serde(default = "d_place_cache_ttl")]
    pub place_cache_ttl_secs: u64,
}

impl Default for GeodataConfig {
    fn default() -> Self {
        Self {
            feature_service_url: d_feature_service_url(),
            request_timeout_secs: d_request_timeout(),
            top_cache_ttl_secs: d_top_cache_ttl(),
            place_cache_ttl_secs: d_place_cache_ttl(),
        }
    }
}

fn d_feature_service_url() -> String {
    "https://services9.arcgis.com/RHVPKKiFTONKtxq3/ArcGIS/rest/services/Air_Quality_PM25_Latest_Results/FeatureServer/0/query".into()
}

fn d_request_timeout() -> u64 {
    15
}

fn d_top_cache_ttl() -> u64 {
    60
}

fn d_place_cache_ttl() -> u64 {
    30
}

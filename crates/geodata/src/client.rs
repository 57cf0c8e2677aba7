//! Feature-service client: the wire boundary to the statistics-capable
//! geodata query endpoint (an ArcGIS feature layer in production).
//!
//! The [`FeatureQuery`] trait is the seam tests stub; [`ArcGisClient`]
//! is the only production implementation.

use serde::Deserialize;
use serde_json::Value;

use aqm_domain::config::GeodataConfig;
use aqm_domain::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Query / result types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A grouped-statistics query against the feature layer.
#[derive(Debug, Clone)]
pub struct StatsQuery {
    /// SQL-ish filter predicate. Every interpolated value must already
    /// be escaped (see [`crate::adapter::escape_like`]).
    pub where_clause: String,
    /// Extra attribute fields to return alongside the statistics.
    pub out_fields: Option<String>,
    /// Statistic descriptors, serialized verbatim into `outStatistics`.
    pub out_statistics: Value,
    pub group_by: String,
    pub having: Option<String>,
    pub order_by: String,
    pub result_count: u32,
    pub return_geometry: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureAttributes {
    pub city: Option<String>,
    pub country_name: Option<String>,
    pub location: Option<String>,
    pub avg_pm25: Option<f64>,
    pub n_stations: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub attributes: FeatureAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureSet {
    #[serde(default)]
    pub features: Vec<Feature>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait + production client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Idempotent, side-effect-free query access to the feature layer.
#[async_trait::async_trait]
pub trait FeatureQuery: Send + Sync {
    async fn query(&self, q: &StatsQuery) -> Result<FeatureSet>;
}

pub struct ArcGisClient {
    url: String,
    client: reqwest::Client,
}

impl ArcGisClient {
    pub fn new(cfg: &GeodataConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            url: cfg.feature_service_url.clone(),
            client,
        })
    }
}

/// Form parameters in the layer's query protocol.
fn to_form_params(q: &StatsQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("where", q.where_clause.clone()),
        ("outStatistics", q.out_statistics.to_string()),
        ("groupByFieldsForStatistics", q.group_by.clone()),
        ("orderByFields", q.order_by.clone()),
        ("resultRecordCount", q.result_count.to_string()),
        ("returnGeometry", q.return_geometry.to_string()),
        ("f", "json".to_string()),
    ];
    if let Some(ref having) = q.having {
        params.push(("having", having.clone()));
    }
    if let Some(ref out_fields) = q.out_fields {
        params.push(("outFields", out_fields.clone()));
    }
    params
}

#[async_trait::async_trait]
impl FeatureQuery for ArcGisClient {
    async fn query(&self, q: &StatsQuery) -> Result<FeatureSet> {
        let params = to_form_params(q);
        let res = self
            .client
            .post(&self.url)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Upstream {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                message: format!("feature service request failed: {e}"),
            })?;

        let status = res.status();
        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                message: format!(
                    "feature service {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("error")
                ),
            });
        }

        let body: Value = res.json().await.map_err(|e| Error::Upstream {
            status: status.as_u16(),
            message: format!("feature service returned invalid JSON: {e}"),
        })?;

        // The layer reports query errors inside a 200 body.
        if let Some(err) = body.get("error") {
            let code = err.get("code").and_then(|v| v.as_u64()).unwrap_or(500) as u16;
            let message = err
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("feature service error")
                .to_string();
            return Err(Error::Upstream {
                status: code,
                message,
            });
        }

        let set: FeatureSet = serde_json::from_value(body).map_err(|e| Error::Upstream {
            status: status.as_u16(),
            message: format!("unexpected feature set shape: {e}"),
        })?;
        tracing::debug!(rows = set.features.len(), "feature query ok");
        Ok(set)
    }
}

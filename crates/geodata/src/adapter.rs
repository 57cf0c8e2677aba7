//! Data-source adapter: the two operations the tool layer needs,
//! a top-N pollution ranking and a best-match place lookup.
//!
//! Both build grouped-statistics queries over the PM2.5 feature layer.
//! Every query conjoins the sanity predicate that excludes physically
//! implausible readings; without it, noise readings dominate rankings.

use std::sync::Arc;

use serde_json::Value;

use aqm_domain::place::{PlaceQuery, PlaceResult, RankedCity};
use aqm_domain::Result;

use crate::client::{FeatureAttributes, FeatureQuery, StatsQuery};
use crate::resolver::MIN_LOOSE_LEN;

/// Keep readings sane: bounded values, a named city, known units.
/// Conjoined to every query; a correctness invariant, not a tuning knob.
pub const SANE_WHERE: &str =
    "value BETWEEN 0 AND 500 AND city IS NOT NULL AND unit IN ('µg/m³','ug/m3')";

pub const DEFAULT_LIMIT: u32 = 5;
pub const MAX_LIMIT: u32 = 20;

/// Escape a user-derived value for interpolation into a filter
/// predicate: lowercase plus `'` doubling. The one place untrusted
/// text reaches the query language.
pub fn escape_like(s: &str) -> String {
    s.to_lowercase().replace('\'', "''")
}

/// Clamp a model-supplied limit into `[1, 20]`; missing or non-finite
/// input falls back to the default rather than failing.
pub fn clamp_limit(raw: Option<f64>) -> u32 {
    match raw {
        Some(v) if v.is_finite() => (v as i64).clamp(1, MAX_LIMIT as i64) as u32,
        _ => DEFAULT_LIMIT,
    }
}

/// `avg` + `count` over the reading value, grouped by place.
fn stats_descriptor() -> Value {
    serde_json::json!([
        { "statisticType": "avg", "onStatisticField": "value", "outStatisticFieldName": "avg_pm25" },
        { "statisticType": "count", "onStatisticField": "value", "outStatisticFieldName": "n_stations" }
    ])
}

/// Disjunction of case-insensitive substring matches of every candidate
/// against both the place-name and station/address fields.
fn candidates_where(candidates: &[String]) -> String {
    let mut parts = Vec::with_capacity(candidates.len() * 2);
    for cand in candidates {
        let s = escape_like(cand);
        parts.push(format!("LOWER(city) LIKE '%{s}%'"));
        parts.push(format!("LOWER(location) LIKE '%{s}%'"));
    }
    format!("({})", parts.join(" OR "))
}

fn country_clause(hint: Option<&str>) -> String {
    match hint {
        Some(h) => format!(" AND LOWER(country_name) LIKE '%{}%'", escape_like(h)),
        None => String::new(),
    }
}

fn best_match(attrs: &FeatureAttributes) -> Option<PlaceResult> {
    let place = attrs.city.clone().or_else(|| attrs.location.clone())?;
    Some(PlaceResult::found(
        place,
        attrs.country_name.clone(),
        attrs.avg_pm25.unwrap_or(0.0).round() as i64,
        attrs.n_stations.unwrap_or(0),
    ))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct AirQualityAdapter {
    client: Arc<dyn FeatureQuery>,
}

impl AirQualityAdapter {
    pub fn new(client: Arc<dyn FeatureQuery>) -> Self {
        Self { client }
    }

    /// Top `limit` places by mean PM2.5, restricted to groups with at
    /// least 3 independent samples, sorted descending. `limit` must
    /// already be clamped (see [`clamp_limit`]).
    pub async fn rank_top(&self, limit: u32) -> Result<Vec<RankedCity>> {
        let q = StatsQuery {
            where_clause: SANE_WHERE.to_string(),
            out_fields: None,
            out_statistics: stats_descriptor(),
            group_by: "city,country_name".into(),
            having: Some("COUNT(value) >= 3".into()),
            order_by: "avg_pm25 DESC".into(),
            result_count: limit,
            return_geometry: false,
        };
        let set = self.client.query(&q).await?;

        let items = set
            .features
            .iter()
            .enumerate()
            .filter_map(|(i, f)| {
                let a = &f.attributes;
                let city = a.city.clone().or_else(|| a.location.clone())?;
                Some(RankedCity {
                    rank: i + 1,
                    city,
                    country: a.country_name.clone(),
                    avg_pm25: a.avg_pm25.unwrap_or(0.0).round() as i64,
                    stations: a.n_stations.unwrap_or(0),
                })
            })
            .collect();
        Ok(items)
    }

    /// Best match for a resolved place query. Two passes: candidate
    /// substrings against city + station text, then the loose wildcard
    /// pattern against station text only.
    pub async fn lookup_best(&self, query: &PlaceQuery) -> Result<PlaceResult> {
        if query.candidates.is_empty() {
            return Ok(PlaceResult::not_found("Empty query."));
        }
        let country = country_clause(query.country_hint.as_deref());

        // Pass A: city/alias candidates (fast path).
        let where_a = format!(
            "{}{} AND {}",
            candidates_where(&query.candidates),
            country,
            SANE_WHERE
        );
        if let Some(result) = self.single_best(where_a).await? {
            return Ok(result);
        }

        // Pass B: loose station/address pattern, tolerant of missing
        // punctuation and diacritics.
        if query.loose_pattern.len() >= MIN_LOOSE_LEN {
            let where_b = format!(
                "(LOWER(location) LIKE '%{}%'){} AND {}",
                query.loose_pattern, country, SANE_WHERE
            );
            if let Some(result) = self.single_best(where_b).await? {
                return Ok(result);
            }
        }

        Ok(PlaceResult::not_found(format!(
            "No recent PM2.5 for \"{}\".",
            query.raw_text
        )))
    }

    async fn single_best(&self, where_clause: String) -> Result<Option<PlaceResult>> {
        let q = StatsQuery {
            where_clause,
            out_fields: Some("city,country_name,location".into()),
            out_statistics: stats_descriptor(),
            group_by: "city,country_name".into(),
            having: None,
            order_by: "avg_pm25 DESC".into(),
            result_count: 1,
            return_geometry: true,
        };
        let set = self.client.query(&q).await?;
        Ok(set.features.first().and_then(|f| best_match(&f.attributes)))
    }
}

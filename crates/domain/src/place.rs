use serde::{Deserialize, Serialize};

/// A free-text place query after normalization by the entity resolver.
///
/// Derived deterministically from the raw text; carries everything the
/// data-source adapter needs to build its two-pass lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceQuery {
    /// The original user text, untouched (used in "not found" messages).
    pub raw_text: String,
    /// Trailing parenthetical country hint, e.g. `"Vietnam"` from
    /// `"… (Vietnam)"`, stripped from the working text.
    pub country_hint: Option<String>,
    /// Lowercased, diacritic-stripped, whitespace-collapsed base form.
    pub normalized_base: String,
    /// Search candidates in priority order (alias set, or raw + base).
    pub candidates: Vec<String>,
    /// Wildcard-interleaved fallback pattern; empty when the alnum base
    /// is shorter than 3 characters.
    pub loose_pattern: String,
}

impl PlaceQuery {
    /// Cache key: normalized base + lowercased country hint.
    pub fn cache_key(&self) -> String {
        format!(
            "{}||{}",
            self.normalized_base,
            self.country_hint.as_deref().unwrap_or("").to_lowercase()
        )
    }
}

/// Structured hint for the presentation layer, surfaced next to a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum MapAction {
    #[serde(rename = "centerOn")]
    CenterOn {
        place: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        country: Option<String>,
    },
}

/// Outcome of a best-match place lookup, in the exact JSON shape fed
/// back to the model as a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_pm25: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stations: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<MapAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PlaceResult {
    pub fn found(
        city: String,
        country: Option<String>,
        avg_pm25: i64,
        stations: i64,
    ) -> Self {
        let action = MapAction::CenterOn {
            place: city.clone(),
            country: country.clone(),
        };
        Self {
            ok: true,
            city: Some(city),
            country,
            avg_pm25: Some(avg_pm25),
            stations: Some(stations),
            action: Some(action),
            message: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            city: None,
            country: None,
            avg_pm25: None,
            stations: None,
            action: None,
            message: Some(message.into()),
        }
    }
}

/// One row of the top-N pollution ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCity {
    pub rank: usize,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub avg_pm25: i64,
    pub stations: i64,
}

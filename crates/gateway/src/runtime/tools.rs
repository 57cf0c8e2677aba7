//! Tool registry: definitions exposed to the model and the dispatcher
//! that executes its calls.
//!
//! Dispatch is infallible by contract. Malformed arguments, unknown
//! tool names and upstream failures all become an `{"ok":false,...}`
//! payload fed back to the model, which then explains the failure in
//! prose; a bad tool call must never abort the turn.

use serde::Deserialize;
use serde_json::{json, Value};

use aqm_domain::place::MapAction;
use aqm_domain::tool::ToolDefinition;
use aqm_geodata::adapter::clamp_limit;

use crate::state::AppState;

pub const TOOL_TOP_CITIES: &str = "get_top_cities";
pub const TOOL_CITY_PM25: &str = "get_city_pm25";

/// Outcome of one tool call: the JSON payload returned to the model and
/// the optional map hint surfaced to the dashboard.
pub struct ToolOutcome {
    pub payload: Value,
    pub action: Option<MapAction>,
}

impl ToolOutcome {
    fn error(message: impl Into<String>) -> Self {
        Self {
            payload: json!({ "error": message.into() }),
            action: None,
        }
    }
}

// ── Typed argument shapes ──────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct TopCitiesArgs {
    #[serde(default)]
    limit: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CityLookupArgs {
    query: String,
}

/// The declarations sent with the first completion of every turn.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: TOOL_TOP_CITIES.into(),
            description: "Get the most polluted cities right now by average PM2.5 (latest hour)."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "number",
                        "description": "How many cities to return (1-20, default 5)."
                    }
                }
            }),
        },
        ToolDefinition {
            name: TOOL_CITY_PM25.into(),
            description:
                "Get the current average PM2.5 for a named city or place. Accepts local spellings, \
                 abbreviations and an optional trailing country hint in parentheses."
                    .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "City or place name, e.g. \"Hanoi\" or \"Sao Paulo (Brazil)\"."
                    }
                },
                "required": ["query"]
            }),
        },
    ]
}

/// Execute one tool call. Reads through the injected caches; only
/// successful upstream results are cached.
pub async fn dispatch_tool(state: &AppState, name: &str, arguments_json: &str) -> ToolOutcome {
    match name {
        TOOL_TOP_CITIES => {
            let args: TopCitiesArgs = match serde_json::from_str(arguments_json) {
                Ok(a) => a,
                Err(e) => return ToolOutcome::error(format!("Tool exec error: {e}")),
            };
            top_cities(state, args).await
        }
        TOOL_CITY_PM25 => {
            let args: CityLookupArgs = match serde_json::from_str(arguments_json) {
                Ok(a) => a,
                Err(e) => return ToolOutcome::error(format!("Tool exec error: {e}")),
            };
            city_pm25(state, args).await
        }
        other => ToolOutcome::error(format!("Unknown tool: {other}")),
    }
}

async fn top_cities(state: &AppState, args: TopCitiesArgs) -> ToolOutcome {
    let limit = clamp_limit(args.limit);
    let key = format!("k={limit}");

    let cities = match state.top_cache.get(key.as_str()) {
        Some(hit) => hit,
        None => match state.geodata.rank_top(limit).await {
            Ok(items) => {
                state.top_cache.insert(key, items.clone());
                items
            }
            Err(e) => {
                tracing::warn!(limit, error = %e, "top-cities query failed");
                return ToolOutcome::error(format!("Tool exec error: {e}"));
            }
        },
    };

    ToolOutcome {
        payload: json!({ "ok": true, "cities": cities }),
        action: None,
    }
}

async fn city_pm25(state: &AppState, args: CityLookupArgs) -> ToolOutcome {
    let query = state.resolver.resolve(&args.query);
    let key = query.cache_key();

    let result = match state.place_cache.get(key.as_str()) {
        Some(hit) => hit,
        None => match state.geodata.lookup_best(&query).await {
            Ok(result) => {
                state.place_cache.insert(key, result.clone());
                result
            }
            Err(e) => {
                tracing::warn!(query = %args.query, error = %e, "place lookup failed");
                return ToolOutcome::error(format!("Tool exec error: {e}"));
            }
        },
    };

    let action = result.action.clone();
    match serde_json::to_value(&result) {
        Ok(payload) => ToolOutcome { payload, action },
        Err(e) => ToolOutcome::error(format!("Tool exec error: {e}")),
    }
}

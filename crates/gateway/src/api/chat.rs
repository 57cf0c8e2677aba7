//! Chat endpoint: `POST /v1/chat`.
//!
//! Error signaling is in-band: the handler always answers `200` with a
//! `{ reply, action? }` body so the dashboard never has to distinguish
//! transport failures from conversational ones. The only non-200 is
//! the `405` for a wrong method.

use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::runtime::{run_turn, HistoryTurn, TurnInput};
use crate::state::AppState;

pub const REPLY_NO_MESSAGE: &str = "Please type a message.";
pub const REPLY_NOT_CONFIGURED: &str =
    "The server is missing a valid language-model API key. Ask the site operator to configure one.";
pub const REPLY_SERVER_ERROR: &str = "Something went wrong on the server. Please try again.";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request shape
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub user_message: String,
    /// Prior turns, most recent last. Filtered to user/assistant text
    /// turns before prompt assembly.
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/chat
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The body is parsed leniently: a malformed JSON body degrades to an
/// empty request, which gets the "type a message" reply.
pub async fn chat(State(state): State<AppState>, body: String) -> Response {
    let req: ChatRequest = serde_json::from_str(&body).unwrap_or_default();

    let user_message = req.user_message.trim().to_string();
    if user_message.is_empty() {
        return reply_json(json!({ "reply": REPLY_NO_MESSAGE }));
    }

    // Credential preflight: no network call without a plausible key.
    let Some(provider) = state.llm.clone() else {
        return reply_json(json!({ "reply": REPLY_NOT_CONFIGURED }));
    };

    let input = TurnInput {
        user_message,
        history: req.history,
    };
    let outcome = run_turn(&state, provider.as_ref(), input).await;

    let mut payload = json!({ "reply": outcome.reply });
    if let Some(action) = outcome.action {
        match serde_json::to_value(&action) {
            Ok(v) => payload["action"] = v,
            Err(e) => {
                tracing::error!(error = %e, "map action serialization failed");
                return reply_json(json!({ "reply": REPLY_SERVER_ERROR }));
            }
        }
    }
    reply_json(payload)
}

/// `405` with an in-band error body for any non-POST method.
pub async fn method_not_allowed() -> Response {
    let mut res = (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "POST only" })),
    )
        .into_response();
    set_no_store(&mut res);
    res
}

/// Replies are live and conversational; nothing on the path may cache them.
fn reply_json(payload: Value) -> Response {
    let mut res = (StatusCode::OK, Json(payload)).into_response();
    set_no_store(&mut res);
    res
}

fn set_no_store(res: &mut Response) {
    res.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate, max-age=0"),
    );
}

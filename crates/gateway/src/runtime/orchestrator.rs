//! Conversation orchestrator: the per-request state machine that runs
//! at most two model completions around one batch of tool calls.
//!
//! Every failure maps to a fixed degraded reply; nothing below this
//! module surfaces an error to the HTTP layer.

use serde::Deserialize;

use aqm_domain::place::MapAction;
use aqm_domain::tool::Message;
use aqm_domain::Error;
use aqm_providers::retry::call_with_retry;
use aqm_providers::{CompletionRequest, CompletionResponse, LlmProvider, ToolChoice};

use crate::runtime::tools::{dispatch_tool, tool_definitions};
use crate::state::AppState;

/// Fixed persona for every conversation. Scope policy lives here, not
/// in per-request prompt assembly.
const SYSTEM_PERSONA: &str = "\
You are a friendly assistant for a live air-quality dashboard showing PM2.5 readings. \
Answer only questions about air quality, pollution and the data on the map; politely decline \
anything else. Use the provided tools for any question that needs current readings and never \
invent numeric values: if a tool reports an error or no data, say so plainly. Be concise \
(a short paragraph at most). When you cite readings, mention the source: OpenAQ via the Esri \
Living Atlas, latest hour. When a tool result carries a map action, mention briefly that the \
map has moved there.";

pub const REPLY_BUSY: &str =
    "The assistant is busy right now. Please try again in a few seconds.";
pub const REPLY_EMPTY: &str = "Sorry, I could not produce a reply. Please try again.";

/// One prior turn as sent by the dashboard. Anything that is not a
/// plain user/assistant text turn is dropped before prompt assembly.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryTurn {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct TurnInput {
    pub user_message: String,
    pub history: Vec<HistoryTurn>,
}

/// What a finished turn hands back to the HTTP layer.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub reply: String,
    pub action: Option<MapAction>,
}

/// Orchestrator states. `ExecutingTools` carries the batch emitted by
/// the first completion; transitions are strictly forward.
enum Phase {
    Start,
    AwaitingFirstCompletion,
    ExecutingTools(CompletionResponse),
    AwaitingSecondCompletion,
    Done(ChatOutcome),
}

/// Run one conversation turn to completion. Infallible by contract:
/// retry exhaustion and non-recoverable provider errors become fixed
/// degraded replies.
pub async fn run_turn(state: &AppState, provider: &dyn LlmProvider, input: TurnInput) -> ChatOutcome {
    let mut messages = Vec::new();
    let mut action: Option<MapAction> = None;
    let mut phase = Phase::Start;

    loop {
        phase = match phase {
            Phase::Start => {
                messages.extend(assemble_messages(state, &input));
                Phase::AwaitingFirstCompletion
            }

            Phase::AwaitingFirstCompletion => {
                let req = completion_request(state, messages.clone(), ToolChoice::Auto);
                match complete_with_retry(state, provider, &req).await {
                    Ok(resp) if resp.tool_calls.is_empty() => Phase::Done(ChatOutcome {
                        reply: non_empty_reply(&resp.content),
                        action: None,
                    }),
                    Ok(resp) => Phase::ExecutingTools(resp),
                    Err(e) => {
                        tracing::warn!(error = %e, "first completion failed");
                        Phase::Done(degraded(&e))
                    }
                }
            }

            Phase::ExecutingTools(resp) => {
                messages.push(Message::assistant_tool_calls(&resp.content, &resp.tool_calls));
                // Strictly sequential, in emission order: every call gets
                // exactly one tool-role message before the second completion.
                for call in &resp.tool_calls {
                    let outcome =
                        dispatch_tool(state, &call.tool_name, &call.arguments_json).await;
                    if outcome.action.is_some() {
                        // Last tool call's action wins.
                        action = outcome.action;
                    }
                    messages.push(Message::tool_result(
                        call.call_id.clone(),
                        outcome.payload.to_string(),
                    ));
                }
                Phase::AwaitingSecondCompletion
            }

            Phase::AwaitingSecondCompletion => {
                let req = completion_request(state, messages.clone(), ToolChoice::None);
                match complete_with_retry(state, provider, &req).await {
                    Ok(resp) => Phase::Done(ChatOutcome {
                        reply: non_empty_reply(&resp.content),
                        action: action.take(),
                    }),
                    Err(e) => {
                        tracing::warn!(error = %e, "second completion failed");
                        Phase::Done(degraded(&e))
                    }
                }
            }

            Phase::Done(outcome) => return outcome,
        };
    }
}

// ── Prompt assembly ────────────────────────────────────────────────

fn assemble_messages(state: &AppState, input: &TurnInput) -> Vec<Message> {
    let caps = &state.config.chat;

    let mut messages = vec![Message::system(SYSTEM_PERSONA)];

    let usable: Vec<&HistoryTurn> = input
        .history
        .iter()
        .filter(|t| t.role == "user" || t.role == "assistant")
        .collect();
    let skip = usable.len().saturating_sub(caps.max_history_turns);
    for turn in &usable[skip..] {
        let text = truncate_chars(&turn.content, caps.max_message_chars);
        if turn.role == "user" {
            messages.push(Message::user(text));
        } else {
            messages.push(Message::assistant(text));
        }
    }

    messages.push(Message::user(truncate_chars(
        input.user_message.trim(),
        caps.max_message_chars,
    )));
    messages
}

fn completion_request(
    state: &AppState,
    messages: Vec<Message>,
    tool_choice: ToolChoice,
) -> CompletionRequest {
    CompletionRequest {
        messages,
        tools: match tool_choice {
            ToolChoice::Auto => tool_definitions(),
            ToolChoice::None => Vec::new(),
        },
        tool_choice,
        temperature: Some(state.config.llm.temperature),
        max_tokens: Some(state.config.llm.max_tokens),
        model: None,
    }
}

async fn complete_with_retry(
    state: &AppState,
    provider: &dyn LlmProvider,
    req: &CompletionRequest,
) -> aqm_domain::Result<CompletionResponse> {
    call_with_retry(&state.retry, || provider.complete(req)).await
}

fn degraded(_e: &Error) -> ChatOutcome {
    ChatOutcome {
        reply: REPLY_BUSY.to_string(),
        action: None,
    }
}

fn non_empty_reply(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        REPLY_EMPTY.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Character-cap (not byte-cap) truncation, safe on multibyte text.
fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

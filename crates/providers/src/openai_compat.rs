//! OpenAI-compatible completion adapter.
//!
//! Works with OpenAI and any other endpoint that follows the OpenAI
//! chat completions contract. Non-streaming only: the orchestrator's
//! two-phase exchange always waits for full responses.

use regex::Regex;
use serde_json::Value;

use aqm_domain::config::LlmConfig;
use aqm_domain::tool::{ContentPart, Message, MessageContent, Role, ToolCall, ToolDefinition};
use aqm_domain::{Error, Result};

use crate::traits::{CompletionRequest, CompletionResponse, LlmProvider, ToolChoice};
use crate::util::from_reqwest;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct OpenAiCompatProvider {
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
    /// Some rate-limit rejections come back as HTTP 200 with an error
    /// body, so the message text is checked too.
    rate_limit_re: Regex,
}

impl OpenAiCompatProvider {
    pub fn new(cfg: &LlmConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model: cfg.model.clone(),
            client,
            rate_limit_re: Regex::new(r"(?i)rate limit").map_err(|e| Error::Other(e.to_string()))?,
        })
    }

    fn build_body(&self, req: &CompletionRequest) -> Value {
        let messages: Vec<Value> = req.messages.iter().map(msg_to_openai).collect();
        let model = req
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
        });

        if req.tool_choice == ToolChoice::Auto && !req.tools.is_empty() {
            let tools: Vec<Value> = req.tools.iter().map(tool_to_openai).collect();
            body["tools"] = Value::Array(tools);
            body["tool_choice"] = Value::String("auto".into());
        }
        if let Some(temp) = req.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(max) = req.max_tokens {
            body["max_tokens"] = serde_json::json!(max);
        }
        body
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(req);

        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = res.status().as_u16();
        let text = res.text().await.map_err(from_reqwest)?;
        // A body that is not JSON maps to Error::Json, which the retry
        // layer treats as a short-delay recoverable parse failure.
        let parsed: Value = serde_json::from_str(&text)?;

        if !(200..300).contains(&status) || parsed.get("error").is_some() {
            let message = parsed
                .pointer("/error/message")
                .and_then(|v| v.as_str())
                .map(str::to_owned)
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(classify_upstream_error(status, message, &self.rate_limit_re));
        }

        parse_completion(&parsed)
    }

    fn provider_id(&self) -> &str {
        "openai_compat"
    }
}

/// HTTP 429 and "rate limit" message text are recoverable; everything
/// else fails the call outright.
fn classify_upstream_error(status: u16, message: String, rate_limit_re: &Regex) -> Error {
    if status == 429 || rate_limit_re.is_match(&message) {
        Error::RateLimited(message)
    } else {
        Error::Provider {
            provider: "openai_compat".into(),
            message,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message serialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn msg_to_openai(msg: &Message) -> Value {
    match msg.role {
        Role::Tool => tool_result_to_openai(msg),
        Role::Assistant => assistant_to_openai(msg),
        _ => {
            let text = msg.content.text().unwrap_or("");
            serde_json::json!({
                "role": role_to_str(msg.role),
                "content": text,
            })
        }
    }
}

fn assistant_to_openai(msg: &Message) -> Value {
    let mut obj = serde_json::json!({"role": "assistant"});
    let mut text_parts: Vec<&str> = Vec::new();
    let mut tool_calls: Vec<Value> = Vec::new();

    match &msg.content {
        MessageContent::Text(t) => text_parts.push(t),
        MessageContent::Parts(parts) => {
            for part in parts {
                match part {
                    ContentPart::Text { text } => text_parts.push(text),
                    ContentPart::ToolUse { id, name, arguments } => {
                        tool_calls.push(serde_json::json!({
                            "id": id,
                            "type": "function",
                            "function": {
                                "name": name,
                                "arguments": arguments,
                            }
                        }));
                    }
                    ContentPart::ToolResult { .. } => {}
                }
            }
        }
    }

    if text_parts.is_empty() {
        obj["content"] = Value::Null;
    } else {
        obj["content"] = Value::String(text_parts.join("\n"));
    }
    if !tool_calls.is_empty() {
        obj["tool_calls"] = Value::Array(tool_calls);
    }
    obj
}

fn tool_result_to_openai(msg: &Message) -> Value {
    if let MessageContent::Parts(parts) = &msg.content {
        for part in parts {
            if let ContentPart::ToolResult { tool_use_id, content } = part {
                return serde_json::json!({
                    "role": "tool",
                    "tool_call_id": tool_use_id,
                    "content": content,
                });
            }
        }
    }
    serde_json::json!({
        "role": "tool",
        "tool_call_id": "",
        "content": msg.content.text().unwrap_or(""),
    })
}

fn tool_to_openai(tool: &ToolDefinition) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_completion(body: &Value) -> Result<CompletionResponse> {
    let choice = body
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| Error::Provider {
            provider: "openai_compat".into(),
            message: "no choices in response".into(),
        })?;

    let message = choice.get("message").ok_or_else(|| Error::Provider {
        provider: "openai_compat".into(),
        message: "no message in choice".into(),
    })?;

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let finish_reason = choice
        .get("finish_reason")
        .and_then(|v| v.as_str())
        .map(String::from);

    let model = body
        .get("model")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    Ok(CompletionResponse {
        content,
        tool_calls: parse_tool_calls(message),
        model,
        finish_reason,
    })
}

fn parse_tool_calls(message: &Value) -> Vec<ToolCall> {
    let arr = match message.get("tool_calls").and_then(|v| v.as_array()) {
        Some(a) => a,
        None => return Vec::new(),
    };
    arr.iter()
        .filter_map(|tc| {
            let call_id = tc.get("id")?.as_str()?.to_string();
            let func = tc.get("function")?;
            let tool_name = func.get("name")?.as_str()?.to_string();
            // Keep arguments as the raw text; the registry owns parsing.
            let arguments_json = func
                .get("arguments")
                .and_then(|v| v.as_str())
                .unwrap_or("{}")
                .to_string();
            Some(ToolCall {
                call_id,
                tool_name,
                arguments_json,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_tool_response() -> Value {
        serde_json::json!({
            "model": "gpt-4o-mini",
            "choices": [{
                "finish_reason": "tool_calls",
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "get_city_pm25",
                            "arguments": "{\"query\":\"Hanoi\"}"
                        }
                    }]
                }
            }]
        })
    }

    #[test]
    fn parses_tool_call_turn() {
        let resp = parse_completion(&fixture_tool_response()).unwrap();
        assert_eq!(resp.content, "");
        assert_eq!(resp.tool_calls.len(), 1);
        assert_eq!(resp.tool_calls[0].call_id, "call_abc");
        assert_eq!(resp.tool_calls[0].tool_name, "get_city_pm25");
        assert_eq!(resp.tool_calls[0].arguments_json, "{\"query\":\"Hanoi\"}");
        assert_eq!(resp.finish_reason.as_deref(), Some("tool_calls"));
    }

    #[test]
    fn parses_plain_text_turn() {
        let body = serde_json::json!({
            "model": "gpt-4o-mini",
            "choices": [{
                "finish_reason": "stop",
                "message": { "content": "Air quality is moderate today." }
            }]
        });
        let resp = parse_completion(&body).unwrap();
        assert_eq!(resp.content, "Air quality is moderate today.");
        assert!(resp.tool_calls.is_empty());
    }

    #[test]
    fn missing_choices_is_a_provider_error() {
        let body = serde_json::json!({"model": "gpt-4o-mini"});
        assert!(matches!(
            parse_completion(&body),
            Err(Error::Provider { .. })
        ));
    }

    #[test]
    fn classifies_429_and_message_text_as_rate_limited() {
        let re = Regex::new(r"(?i)rate limit").unwrap();
        assert!(matches!(
            classify_upstream_error(429, "too many requests".into(), &re),
            Error::RateLimited(_)
        ));
        assert!(matches!(
            classify_upstream_error(200, "Rate limit reached for gpt-4o-mini".into(), &re),
            Error::RateLimited(_)
        ));
        assert!(matches!(
            classify_upstream_error(500, "internal error".into(), &re),
            Error::Provider { .. }
        ));
    }

    #[test]
    fn tool_result_message_carries_call_id_on_the_wire() {
        let msg = Message::tool_result("call_abc", "{\"ok\":true}");
        let wire = msg_to_openai(&msg);
        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_call_id"], "call_abc");
        assert_eq!(wire["content"], "{\"ok\":true}");
    }

    #[test]
    fn assistant_tool_call_message_serializes_function_block() {
        let calls = vec![ToolCall {
            call_id: "call_1".into(),
            tool_name: "get_top_cities".into(),
            arguments_json: "{\"limit\":3}".into(),
        }];
        let wire = msg_to_openai(&Message::assistant_tool_calls("", &calls));
        assert_eq!(wire["role"], "assistant");
        assert_eq!(wire["content"], Value::Null);
        assert_eq!(wire["tool_calls"][0]["function"]["name"], "get_top_cities");
        assert_eq!(wire["tool_calls"][0]["function"]["arguments"], "{\"limit\":3}");
    }
}

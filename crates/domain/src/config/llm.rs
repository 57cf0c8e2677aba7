use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM completion endpoint
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible chat-completions API.
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Model identifier sent in every completion request.
    #[serde(default = "d_model")]
    pub model: String,
    /// Environment variable holding the API key. The key itself never
    /// lives in the config file.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_temperature")]
    pub temperature: f32,
    #[serde(default = "d_max_tokens")]
    pub max_tokens: u32,
    /// Hard per-request timeout. The original glue relied on transport
    /// defaults; an explicit bound keeps a hung upstream from pinning
    /// the whole request.
    #[serde(default = "d_request_timeout")]
    pub request_timeout_secs: u64,
    /// Retry budget for each completion call (rate limits and response
    /// parse failures are the only recoverable classes).
    #[serde(default = "d_max_attempts")]
    pub max_attempts: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            model: d_model(),
            api_key_env: d_api_key_env(),
            temperature: d_temperature(),
            max_tokens: d_max_tokens(),
            request_timeout_secs: d_request_timeout(),
            max_attempts: d_max_attempts(),
        }
    }
}

fn d_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn d_model() -> String {
    "gpt-4o-mini".into()
}

fn d_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}

fn d_temperature() -> f32 {
    0.7
}

fn d_max_tokens() -> u32 {
    350
}

fn d_request_timeout() -> u64 {
    30
}

fn d_max_attempts() -> u32 {
    3
}

//! Shared utility functions for provider adapters.

use aqm_domain::config::LlmConfig;
use aqm_domain::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve the API key from the environment variable named in config.
pub fn resolve_api_key(cfg: &LlmConfig) -> Result<String> {
    std::env::var(&cfg.api_key_env).map_err(|_| {
        Error::Auth(format!(
            "environment variable '{}' not set or not valid UTF-8",
            cfg.api_key_env
        ))
    })
}

/// Cheap plausibility check for an OpenAI-style secret key. Used by the
/// gateway preflight so a missing or mangled key surfaces as a
/// configuration-error reply before any network call is made.
pub fn looks_like_openai_key(key: &str) -> bool {
    key.starts_with("sk-") && key.len() > 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_plausibility() {
        assert!(looks_like_openai_key("sk-proj-abcdef123456"));
        assert!(!looks_like_openai_key(""));
        assert!(!looks_like_openai_key("sk-"));
        assert!(!looks_like_openai_key("Bearer xyz"));
    }
}

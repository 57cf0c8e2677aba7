//! LLM completion adapters for the aqmap gateway.
//!
//! The orchestrator talks to a [`LlmProvider`] trait object; the only
//! production implementation is the OpenAI-compatible adapter. A scripted
//! mock lives in [`mock`] for deterministic tests.

pub mod mock;
pub mod openai_compat;
pub mod retry;
pub mod traits;
pub mod util;

pub use openai_compat::OpenAiCompatProvider;
pub use retry::{call_with_retry, RetryPolicy};
pub use traits::{CompletionRequest, CompletionResponse, LlmProvider, ToolChoice};

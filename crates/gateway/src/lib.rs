//! HTTP gateway for the air-quality chat assistant.
//!
//! Wires the entity resolver, geodata adapter, result caches and the
//! LLM provider into a single chat endpoint consumed by the dashboard.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod state;

//! Shared types for the aqmap assistant: error enum, configuration,
//! conversation/tool types, and place query/result types.

pub mod config;
pub mod error;
pub mod place;
pub mod tool;

pub use error::{Error, Result};

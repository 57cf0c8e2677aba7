//! Geodata access for the aqmap assistant: free-text place resolution,
//! the statistics-capable feature-service adapter, and the TTL result
//! cache the tool layer reads through.

pub mod adapter;
pub mod aliases;
pub mod cache;
pub mod client;
pub mod resolver;

pub use adapter::AirQualityAdapter;
pub use cache::TtlCache;
pub use client::{ArcGisClient, FeatureQuery, FeatureSet, StatsQuery};
pub use resolver::PlaceResolver;

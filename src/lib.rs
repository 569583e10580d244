//! Wayfarer - trip planning with a conversational itinerary assistant
//!
//! This library provides the core functionality for managing trips and their
//! day-by-day itineraries, a pure reducer for itinerary edits, and an
//! assistant bridge that lets a language model edit itineraries through
//! structured tool calls.

pub mod api;
pub mod assistant;
pub mod auth;
pub mod config;
pub mod error;
pub mod geocode;
pub mod itinerary;
pub mod models;
pub mod rates;
pub mod store;
pub mod web;

// Re-export core types for public API
pub use assistant::{AssistantBridge, ChatModel, GeminiClient};
pub use auth::{AuthProvider, User};
pub use config::WayfarerConfig;
pub use error::WayfarerError;
pub use geocode::{GeocodingClient, Place};
pub use models::{Activity, ActivityCategory, Coordinates, Day, Trip};
pub use rates::RateClient;
pub use store::TripStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Data models for the Wayfarer application
//!
//! This module contains the core domain models organized by concern:
//! - Trip: the top-level itinerary container with its days
//! - Activity: a single scheduled item within a day
//! - Coordinates: geographic position metadata

pub mod activity;
pub mod trip;

// Re-export all public types for convenient access
pub use activity::{Activity, ActivityCategory};
pub use trip::{Coordinates, Day, Trip};

//! Activity model: a single scheduled item within a day

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::trip::Coordinates;

/// Category of a scheduled activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActivityCategory {
    Sightseeing,
    Food,
    Transport,
    Lodging,
    #[default]
    Other,
}

impl ActivityCategory {
    /// Parse a category from a loosely-typed external string.
    /// Unknown values coerce to `Other` rather than failing.
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "sightseeing" => Self::Sightseeing,
            "food" => Self::Food,
            "transport" => Self::Transport,
            "lodging" => Self::Lodging,
            _ => Self::Other,
        }
    }
}

/// A single scheduled item (sight, meal, transit, lodging, other)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Unique activity identifier
    pub id: String,
    /// Time of day this activity starts
    pub time: NaiveTime,
    /// Short human-readable title
    pub title: String,
    #[serde(default)]
    pub category: ActivityCategory,
    /// Optional location name (free text)
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Cost in the trip's display currency; `None` counts as zero
    #[serde(default)]
    pub cost: Option<f64>,
}

/// Parse a time-of-day from an external payload.
/// Accepts `HH:MM` and `HH:MM:SS`; anything else is rejected.
#[must_use]
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

//! Trip and day models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::activity::Activity;

/// Geographic coordinates in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One calendar date within a trip, holding zero or more activities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    /// Unique day identifier
    pub id: String,
    /// ISO calendar date
    pub date: NaiveDate,
    /// Activities kept sorted by time after every mutation
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl Day {
    /// Whether the activity list is sorted by time of day
    #[must_use]
    pub fn is_time_sorted(&self) -> bool {
        self.activities.windows(2).all(|w| w[0].time <= w[1].time)
    }
}

/// Top-level itinerary container for a date-bounded journey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    /// Unique trip identifier
    pub id: String,
    pub title: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// One day per calendar date from start to end inclusive
    #[serde(default)]
    pub days: Vec<Day>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    /// Display currency for activity costs (ISO 4217)
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Trip {
    /// Check the day-coverage invariant: days cover every calendar date from
    /// start to end inclusive, exactly once each, in order.
    #[must_use]
    pub fn days_are_consistent(&self) -> bool {
        if self.end_date < self.start_date {
            return false;
        }
        let mut expected = self.start_date;
        for day in &self.days {
            if day.date != expected {
                return false;
            }
            match expected.succ_opt() {
                Some(next) => expected = next,
                None => return false,
            }
        }
        // All dates matched in order; the last one consumed must be end_date.
        expected == self.end_date.succ_opt().unwrap_or(self.end_date)
    }

    /// Look up a day by identifier
    #[must_use]
    pub fn day(&self, day_id: &str) -> Option<&Day> {
        self.days.iter().find(|d| d.id == day_id)
    }
}

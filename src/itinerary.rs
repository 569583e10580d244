//! Itinerary reducer: pure functions over trips, days and activities
//!
//! All operations here are pure and total: they take a trip by value, return
//! the updated trip, and no-op on unknown identifiers instead of failing.
//! Callers that need to report unknown ids (the HTTP API, the assistant
//! tools) check existence before applying the operation. Every mutation
//! preserves the per-day invariant that activities stay sorted by time of
//! day.

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::models::{Activity, ActivityCategory, Coordinates, Day, Trip};

/// Default start time for activities created without an explicit time
#[must_use]
pub fn default_activity_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).expect("valid time literal")
}

/// Fields supplied when creating an activity; everything is optional and
/// missing fields fall back to defaults.
#[derive(Debug, Clone, Default)]
pub struct ActivityDraft {
    /// Pre-assigned identifier; generated when absent
    pub id: Option<String>,
    pub time: Option<NaiveTime>,
    pub title: Option<String>,
    pub category: Option<ActivityCategory>,
    pub location: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub notes: Option<String>,
    pub cost: Option<f64>,
}

/// Fields supplied when updating an activity; `Some` replaces, `None` keeps.
#[derive(Debug, Clone, Default)]
pub struct ActivityPatch {
    pub time: Option<NaiveTime>,
    pub title: Option<String>,
    pub category: Option<ActivityCategory>,
    pub location: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub notes: Option<String>,
    pub cost: Option<f64>,
}

/// Fields supplied when creating a trip
#[derive(Debug, Clone)]
pub struct TripDraft {
    pub title: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cover_image: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub currency: Option<String>,
}

/// Produce one day per calendar date from `start` to `end` inclusive, each
/// with a unique identifier. Returns an empty list if `end` precedes `start`.
#[must_use]
pub fn expand_date_range(start: NaiveDate, end: NaiveDate) -> Vec<Day> {
    if end < start {
        return Vec::new();
    }

    let mut days = Vec::new();
    let mut date = start;
    loop {
        days.push(Day {
            id: Uuid::new_v4().to_string(),
            date,
            activities: Vec::new(),
        });
        if date >= end {
            break;
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    days
}

/// Create a trip with a generated identifier and auto-expanded days
#[must_use]
pub fn create_trip(draft: TripDraft) -> Trip {
    let days = expand_date_range(draft.start_date, draft.end_date);
    Trip {
        id: Uuid::new_v4().to_string(),
        title: draft.title,
        destination: draft.destination,
        start_date: draft.start_date,
        end_date: draft.end_date,
        days,
        cover_image: draft.cover_image,
        coordinates: draft.coordinates,
        currency: draft.currency.unwrap_or_else(|| "USD".to_string()),
    }
}

/// Insert an activity into the target day, merging defaults with the supplied
/// fields, then re-sort the day by time. No-op on unknown `day_id`.
#[must_use]
pub fn add_activity(mut trip: Trip, day_id: &str, draft: ActivityDraft) -> Trip {
    let Some(day) = trip.days.iter_mut().find(|d| d.id == day_id) else {
        return trip;
    };

    day.activities.push(Activity {
        id: draft.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        time: draft.time.unwrap_or_else(default_activity_time),
        title: draft.title.unwrap_or_else(|| "New activity".to_string()),
        category: draft.category.unwrap_or_default(),
        location: draft.location,
        coordinates: draft.coordinates,
        notes: draft.notes,
        cost: draft.cost,
    });
    day.activities.sort_by_key(|a| a.time);
    trip
}

/// Merge patch fields into the matching activity and re-sort the day by
/// time. No-op if either identifier is unknown.
#[must_use]
pub fn update_activity(
    mut trip: Trip,
    day_id: &str,
    activity_id: &str,
    patch: ActivityPatch,
) -> Trip {
    let Some(day) = trip.days.iter_mut().find(|d| d.id == day_id) else {
        return trip;
    };
    let Some(activity) = day.activities.iter_mut().find(|a| a.id == activity_id) else {
        return trip;
    };

    if let Some(time) = patch.time {
        activity.time = time;
    }
    if let Some(title) = patch.title {
        activity.title = title;
    }
    if let Some(category) = patch.category {
        activity.category = category;
    }
    if let Some(location) = patch.location {
        activity.location = Some(location);
    }
    if let Some(coordinates) = patch.coordinates {
        activity.coordinates = Some(coordinates);
    }
    if let Some(notes) = patch.notes {
        activity.notes = Some(notes);
    }
    if let Some(cost) = patch.cost {
        activity.cost = Some(cost);
    }

    day.activities.sort_by_key(|a| a.time);
    trip
}

/// Filter the activity out of the target day. Idempotent: removing an absent
/// activity is a no-op.
#[must_use]
pub fn remove_activity(mut trip: Trip, day_id: &str, activity_id: &str) -> Trip {
    if let Some(day) = trip.days.iter_mut().find(|d| d.id == day_id) {
        day.activities.retain(|a| a.id != activity_id);
    }
    trip
}

/// Sum of all activity costs across all days; missing cost counts as zero.
#[must_use]
pub fn total_cost(trip: &Trip) -> f64 {
    trip.days
        .iter()
        .flat_map(|d| &d.activities)
        .map(|a| a.cost.unwrap_or(0.0))
        .sum()
}

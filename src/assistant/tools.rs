//! Tool definitions and dispatch for the itinerary assistant
//!
//! Tool invocations map 1:1 to itinerary reducer operations plus a
//! read-only trip snapshot and a currency-rate fetch. Execution never
//! panics and never aborts the turn: unknown tool names, missing
//! parameters, and downstream failures all resolve to an error outcome
//! whose text is fed back to the model.

use serde_json::{Value, json};

use crate::itinerary::{self, ActivityDraft, ActivityPatch};
use crate::models::activity::parse_time_of_day;
use crate::models::{ActivityCategory, Coordinates};
use crate::rates::RateClient;
use crate::store::TripStore;

/// A tool the assistant may invoke, with its JSON-schema input contract
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Result of a tool invocation, serialized back to the model as text
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// Shared state for tool execution, scoped to one trip's conversation
pub struct ToolContext<'a> {
    pub store: &'a TripStore,
    pub rates: &'a RateClient,
    pub trip_id: &'a str,
}

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "add_activity".to_string(),
            description: "Add an activity to a day of the trip. Returns the new activity id."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "day_id": {
                        "type": "string",
                        "description": "Identifier of the day to add the activity to"
                    },
                    "title": {
                        "type": "string",
                        "description": "Short title for the activity"
                    },
                    "time": {
                        "type": "string",
                        "description": "Start time of day as HH:MM (24h)"
                    },
                    "category": {
                        "type": "string",
                        "enum": ["sightseeing", "food", "transport", "lodging", "other"],
                        "description": "Activity category"
                    },
                    "location": {
                        "type": "string",
                        "description": "Location name (free text)"
                    },
                    "latitude": {"type": "number"},
                    "longitude": {"type": "number"},
                    "notes": {"type": "string"},
                    "cost": {
                        "type": "number",
                        "description": "Cost in the trip's display currency"
                    }
                },
                "required": ["day_id", "title"]
            }),
        },
        ToolDefinition {
            name: "update_activity".to_string(),
            description: "Update fields of an existing activity. Only the supplied fields change."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "day_id": {"type": "string"},
                    "activity_id": {"type": "string"},
                    "title": {"type": "string"},
                    "time": {
                        "type": "string",
                        "description": "Start time of day as HH:MM (24h)"
                    },
                    "category": {
                        "type": "string",
                        "enum": ["sightseeing", "food", "transport", "lodging", "other"]
                    },
                    "location": {"type": "string"},
                    "latitude": {"type": "number"},
                    "longitude": {"type": "number"},
                    "notes": {"type": "string"},
                    "cost": {"type": "number"}
                },
                "required": ["day_id", "activity_id"]
            }),
        },
        ToolDefinition {
            name: "remove_activity".to_string(),
            description: "Remove an activity from a day. Removing an unknown activity is a no-op."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "day_id": {"type": "string"},
                    "activity_id": {"type": "string"}
                },
                "required": ["day_id", "activity_id"]
            }),
        },
        ToolDefinition {
            name: "get_trip_details".to_string(),
            description:
                "Get the full trip snapshot: days, activities, and the total cost so far."
                    .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolDefinition {
            name: "get_exchange_rate".to_string(),
            description: "Get the conversion rate between two ISO 4217 currencies.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "from": {
                        "type": "string",
                        "description": "Source currency code, e.g. 'USD'"
                    },
                    "to": {
                        "type": "string",
                        "description": "Target currency code, e.g. 'EUR'"
                    }
                },
                "required": ["from", "to"]
            }),
        },
    ]
}

/// Execute a tool by name against the current trip.
pub async fn execute(ctx: &ToolContext<'_>, name: &str, arguments: &Value) -> ToolOutcome {
    tracing::debug!(tool = %name, trip_id = %ctx.trip_id, "executing tool");
    match name {
        "add_activity" => add_activity(ctx, arguments).await,
        "update_activity" => update_activity(ctx, arguments).await,
        "remove_activity" => remove_activity(ctx, arguments).await,
        "get_trip_details" => get_trip_details(ctx).await,
        "get_exchange_rate" => get_exchange_rate(ctx, arguments).await,
        _ => ToolOutcome::error(format!("Unknown tool: {name}")),
    }
}

/// Extract draft fields shared by add and update. Returns an error outcome
/// on values that cannot be coerced (e.g. an unparseable time).
fn activity_fields(arguments: &Value) -> Result<ActivityDraft, ToolOutcome> {
    let time = match arguments.get("time").and_then(|v| v.as_str()) {
        Some(raw) => match parse_time_of_day(raw) {
            Some(t) => Some(t),
            None => {
                return Err(ToolOutcome::error(format!(
                    "Invalid time '{raw}': expected HH:MM (24h)"
                )));
            }
        },
        None => None,
    };

    let coordinates = match (
        arguments.get("latitude").and_then(Value::as_f64),
        arguments.get("longitude").and_then(Value::as_f64),
    ) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
        _ => None,
    };

    Ok(ActivityDraft {
        id: None,
        time,
        title: arguments
            .get("title")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        category: arguments
            .get("category")
            .and_then(|v| v.as_str())
            .map(ActivityCategory::parse_lenient),
        location: arguments
            .get("location")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        coordinates,
        notes: arguments
            .get("notes")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        cost: arguments.get("cost").and_then(Value::as_f64),
    })
}

async fn add_activity(ctx: &ToolContext<'_>, arguments: &Value) -> ToolOutcome {
    let Some(day_id) = arguments.get("day_id").and_then(|v| v.as_str()) else {
        return ToolOutcome::error("Missing required parameter: day_id");
    };

    let mut draft = match activity_fields(arguments) {
        Ok(draft) => draft,
        Err(outcome) => return outcome,
    };
    // Pre-assign the id so it can be reported back to the model.
    let activity_id = uuid::Uuid::new_v4().to_string();
    draft.id = Some(activity_id.clone());

    let Some(trip) = ctx.store.get(ctx.trip_id).await else {
        return ToolOutcome::error(format!("Trip not found: {}", ctx.trip_id));
    };
    if trip.day(day_id).is_none() {
        return ToolOutcome::error(format!("Day not found: {day_id}"));
    }

    match ctx
        .store
        .update(ctx.trip_id, |t| itinerary::add_activity(t, day_id, draft))
        .await
    {
        Ok(Some(_)) => ToolOutcome::success(
            json!({
                "status": "added",
                "activity_id": activity_id,
                "day_id": day_id,
            })
            .to_string(),
        ),
        Ok(None) => ToolOutcome::error(format!("Trip not found: {}", ctx.trip_id)),
        Err(e) => ToolOutcome::error(format!("Failed to save activity: {e}")),
    }
}

async fn update_activity(ctx: &ToolContext<'_>, arguments: &Value) -> ToolOutcome {
    let Some(day_id) = arguments.get("day_id").and_then(|v| v.as_str()) else {
        return ToolOutcome::error("Missing required parameter: day_id");
    };
    let Some(activity_id) = arguments.get("activity_id").and_then(|v| v.as_str()) else {
        return ToolOutcome::error("Missing required parameter: activity_id");
    };

    let draft = match activity_fields(arguments) {
        Ok(draft) => draft,
        Err(outcome) => return outcome,
    };
    let patch = ActivityPatch {
        time: draft.time,
        title: draft.title,
        category: draft.category,
        location: draft.location,
        coordinates: draft.coordinates,
        notes: draft.notes,
        cost: draft.cost,
    };

    let Some(trip) = ctx.store.get(ctx.trip_id).await else {
        return ToolOutcome::error(format!("Trip not found: {}", ctx.trip_id));
    };
    let exists = trip
        .day(day_id)
        .is_some_and(|d| d.activities.iter().any(|a| a.id == activity_id));
    if !exists {
        return ToolOutcome::error(format!("Activity not found: {activity_id} in day {day_id}"));
    }

    match ctx
        .store
        .update(ctx.trip_id, |t| {
            itinerary::update_activity(t, day_id, activity_id, patch)
        })
        .await
    {
        Ok(Some(_)) => ToolOutcome::success(
            json!({
                "status": "updated",
                "activity_id": activity_id,
                "day_id": day_id,
            })
            .to_string(),
        ),
        Ok(None) => ToolOutcome::error(format!("Trip not found: {}", ctx.trip_id)),
        Err(e) => ToolOutcome::error(format!("Failed to save activity: {e}")),
    }
}

async fn remove_activity(ctx: &ToolContext<'_>, arguments: &Value) -> ToolOutcome {
    let Some(day_id) = arguments.get("day_id").and_then(|v| v.as_str()) else {
        return ToolOutcome::error("Missing required parameter: day_id");
    };
    let Some(activity_id) = arguments.get("activity_id").and_then(|v| v.as_str()) else {
        return ToolOutcome::error("Missing required parameter: activity_id");
    };

    match ctx
        .store
        .update(ctx.trip_id, |t| {
            itinerary::remove_activity(t, day_id, activity_id)
        })
        .await
    {
        // Removal is idempotent: reports success whether or not the
        // activity was present.
        Ok(Some(_)) => ToolOutcome::success(
            json!({
                "status": "removed",
                "activity_id": activity_id,
                "day_id": day_id,
            })
            .to_string(),
        ),
        Ok(None) => ToolOutcome::error(format!("Trip not found: {}", ctx.trip_id)),
        Err(e) => ToolOutcome::error(format!("Failed to remove activity: {e}")),
    }
}

async fn get_trip_details(ctx: &ToolContext<'_>) -> ToolOutcome {
    let Some(trip) = ctx.store.get(ctx.trip_id).await else {
        return ToolOutcome::error(format!("Trip not found: {}", ctx.trip_id));
    };

    let total_cost = itinerary::total_cost(&trip);
    ToolOutcome::success(
        json!({
            "trip": trip,
            "total_cost": total_cost,
        })
        .to_string(),
    )
}

async fn get_exchange_rate(ctx: &ToolContext<'_>, arguments: &Value) -> ToolOutcome {
    let Some(from) = arguments.get("from").and_then(|v| v.as_str()) else {
        return ToolOutcome::error("Missing required parameter: from");
    };
    let Some(to) = arguments.get("to").and_then(|v| v.as_str()) else {
        return ToolOutcome::error("Missing required parameter: to");
    };

    match ctx.rates.get_rate(from, to).await {
        Ok(rate) => ToolOutcome::success(
            json!({
                "from": from.to_ascii_uppercase(),
                "to": to.to_ascii_uppercase(),
                "rate": rate,
            })
            .to_string(),
        ),
        Err(e) => ToolOutcome::error(format!("Rate lookup failed: {e}")),
    }
}

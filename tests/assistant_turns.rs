//! End-to-end assistant turns against a real store, with scripted models.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::NaiveTime;
use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::TempDir;

use wayfarer::assistant::{AssistantBridge, ChatModel, Content, Part, ToolContext};
use wayfarer::config::RatesConfig;
use wayfarer::itinerary::{self, TripDraft};
use wayfarer::rates::RateClient;
use wayfarer::store::TripStore;

fn rate_client() -> RateClient {
    RateClient::new(&RatesConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_seconds: 1,
        cache_ttl_minutes: 1,
    })
    .unwrap()
}

async fn seeded_store(dir: &TempDir) -> (TripStore, String, String) {
    let store = TripStore::open(dir.path()).unwrap();
    let trip = store
        .create(itinerary::create_trip(TripDraft {
            title: "Paris long weekend".to_string(),
            destination: "Paris, France".to_string(),
            start_date: "2026-09-18".parse().unwrap(),
            end_date: "2026-09-21".parse().unwrap(),
            cover_image: None,
            coordinates: None,
            currency: Some("EUR".to_string()),
        }))
        .await
        .unwrap();
    let day_id = trip.days[0].id.clone();
    (store, trip.id, day_id)
}

/// Last function response in the history, if the previous round ran tools.
fn last_function_response(history: &[Content]) -> Option<(&str, &Value)> {
    let last = history.last()?;
    let part = last
        .parts
        .iter()
        .find_map(|p| p.function_response.as_ref())?;
    Some((part.name.as_str(), &part.response))
}

/// Model that adds an activity, reads the reported id from the tool
/// response, then updates that same activity before replying in text.
struct AddThenUpdateModel {
    day_id: String,
}

#[async_trait]
impl ChatModel for AddThenUpdateModel {
    async fn complete(&self, _system_prompt: &str, history: &[Content]) -> Result<Content> {
        match last_function_response(history) {
            None => Ok(Content {
                role: "model".to_string(),
                parts: vec![Part::function_call(
                    "add_activity",
                    json!({
                        "day_id": self.day_id,
                        "title": "Louvre",
                        "time": "11:00",
                        "cost": 22.0,
                    }),
                )],
            }),
            Some(("add_activity", response)) => {
                let result: Value = serde_json::from_str(
                    response["result"]
                        .as_str()
                        .ok_or_else(|| anyhow!("add_activity reported an error"))?,
                )?;
                let activity_id = result["activity_id"]
                    .as_str()
                    .ok_or_else(|| anyhow!("missing activity_id"))?;
                Ok(Content {
                    role: "model".to_string(),
                    parts: vec![Part::function_call(
                        "update_activity",
                        json!({
                            "day_id": self.day_id,
                            "activity_id": activity_id,
                            "title": "Louvre (timed entry)",
                            "time": "09:30",
                            "cost": 26.0,
                        }),
                    )],
                })
            }
            Some(("update_activity", _)) => Ok(Content::model_text(
                "Booked the Louvre with a timed entry at 09:30.",
            )),
            Some((other, _)) => Err(anyhow!("unexpected tool response: {other}")),
        }
    }
}

/// Sequential add-then-update on the same freshly created activity must
/// leave exactly one activity carrying the updated fields.
#[tokio::test]
async fn test_add_then_update_same_activity_in_one_turn() {
    let dir = TempDir::new().unwrap();
    let (store, trip_id, day_id) = seeded_store(&dir).await;
    let rates = rate_client();
    let ctx = ToolContext {
        store: &store,
        rates: &rates,
        trip_id: &trip_id,
    };

    let bridge = AssistantBridge::new(
        Arc::new(AddThenUpdateModel {
            day_id: day_id.clone(),
        }),
        8,
    );

    let mut history = Vec::new();
    let reply = bridge
        .run_turn(&ctx, &mut history, "Add the Louvre, morning if possible")
        .await
        .unwrap();
    assert!(reply.contains("Louvre"));

    let trip = store.get(&trip_id).await.unwrap();
    let day = trip.day(&day_id).unwrap();
    assert_eq!(day.activities.len(), 1);
    let activity = &day.activities[0];
    assert_eq!(activity.title, "Louvre (timed entry)");
    assert_eq!(activity.time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
    assert_eq!(activity.cost, Some(26.0));
}

/// Model that issues two adds in a single batch; the bridge must run them
/// in order and the day must come back time-sorted.
struct BatchAddModel {
    day_id: String,
}

#[async_trait]
impl ChatModel for BatchAddModel {
    async fn complete(&self, _system_prompt: &str, history: &[Content]) -> Result<Content> {
        if last_function_response(history).is_some() {
            return Ok(Content::model_text("Added both."));
        }
        Ok(Content {
            role: "model".to_string(),
            parts: vec![
                Part::function_call(
                    "add_activity",
                    json!({"day_id": self.day_id, "title": "Dinner", "time": "19:00"}),
                ),
                Part::function_call(
                    "add_activity",
                    json!({"day_id": self.day_id, "title": "Breakfast", "time": "08:00"}),
                ),
            ],
        })
    }
}

#[tokio::test]
async fn test_batched_calls_execute_in_order_and_day_stays_sorted() {
    let dir = TempDir::new().unwrap();
    let (store, trip_id, day_id) = seeded_store(&dir).await;
    let rates = rate_client();
    let ctx = ToolContext {
        store: &store,
        rates: &rates,
        trip_id: &trip_id,
    };

    let bridge = AssistantBridge::new(
        Arc::new(BatchAddModel {
            day_id: day_id.clone(),
        }),
        8,
    );

    let mut history = Vec::new();
    bridge
        .run_turn(&ctx, &mut history, "Add dinner and breakfast to day 1")
        .await
        .unwrap();

    // One batch, two responses in call order.
    let responses: Vec<_> = history[2]
        .parts
        .iter()
        .filter_map(|p| p.function_response.as_ref())
        .collect();
    assert_eq!(responses.len(), 2);

    let trip = store.get(&trip_id).await.unwrap();
    let day = trip.day(&day_id).unwrap();
    let titles: Vec<_> = day.activities.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["Breakfast", "Dinner"]);
}

/// Model whose first round mixes a failing call with a valid one; the turn
/// must still complete and the valid edit must land.
struct PartialFailureModel {
    day_id: String,
}

#[async_trait]
impl ChatModel for PartialFailureModel {
    async fn complete(&self, _system_prompt: &str, history: &[Content]) -> Result<Content> {
        if last_function_response(history).is_some() {
            let responses: Vec<_> = history
                .last()
                .unwrap()
                .parts
                .iter()
                .filter_map(|p| p.function_response.as_ref())
                .collect();
            let errored = responses.iter().any(|r| r.response.get("error").is_some());
            return Ok(Content::model_text(if errored {
                "I couldn't look up the exchange rate, but the museum visit is added."
            } else {
                "Done."
            }));
        }
        Ok(Content {
            role: "model".to_string(),
            parts: vec![
                Part::function_call("get_exchange_rate", json!({"from": "USD", "to": "EUR"})),
                Part::function_call(
                    "add_activity",
                    json!({"day_id": self.day_id, "title": "Musee d'Orsay", "time": "14:00"}),
                ),
            ],
        })
    }
}

#[tokio::test]
async fn test_tool_failure_degrades_without_aborting_turn() {
    let dir = TempDir::new().unwrap();
    let (store, trip_id, day_id) = seeded_store(&dir).await;
    let rates = rate_client();
    let ctx = ToolContext {
        store: &store,
        rates: &rates,
        trip_id: &trip_id,
    };

    let bridge = AssistantBridge::new(
        Arc::new(PartialFailureModel {
            day_id: day_id.clone(),
        }),
        8,
    );

    let mut history = Vec::new();
    let reply = bridge
        .run_turn(&ctx, &mut history, "Add the Orsay and convert $30")
        .await
        .unwrap();
    assert!(reply.contains("added"));

    let trip = store.get(&trip_id).await.unwrap();
    assert_eq!(trip.day(&day_id).unwrap().activities.len(), 1);
}

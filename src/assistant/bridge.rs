//! Conversation turn state machine
//!
//! One turn: send the history, then either the model answers in plain text
//! (turn complete) or returns a batch of function calls. Calls execute
//! sequentially in the order the model supplied them; their results are fed
//! back as function responses and the loop repeats, bounded by
//! `max_tool_rounds`. Tool failures become textual results inside the
//! conversation and never abort the turn.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::gemini::{Content, FunctionCall, Part};
use super::prompt;
use super::tools::{self, ToolContext};

/// Seam over the generative-language API, so turns can be driven by a
/// scripted model in tests.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce the model's next conversation entry.
    async fn complete(&self, system_prompt: &str, history: &[Content]) -> Result<Content>;
}

pub struct AssistantBridge {
    model: Arc<dyn ChatModel>,
    max_tool_rounds: usize,
}

impl AssistantBridge {
    pub fn new(model: Arc<dyn ChatModel>, max_tool_rounds: usize) -> Self {
        Self {
            model,
            max_tool_rounds,
        }
    }

    /// Run one conversation turn, mutating `history` in place.
    /// Returns the model's final plain-text reply.
    #[tracing::instrument(name = "assistant_turn", level = "debug", skip_all, fields(trip_id = %ctx.trip_id))]
    pub async fn run_turn(
        &self,
        ctx: &ToolContext<'_>,
        history: &mut Vec<Content>,
        user_message: &str,
    ) -> Result<String> {
        let trip = ctx
            .store
            .get(ctx.trip_id)
            .await
            .ok_or_else(|| anyhow!("Trip not found: {}", ctx.trip_id))?;
        let system_prompt = prompt::system_prompt(&trip);

        history.push(Content::user_text(user_message));

        for round in 0..self.max_tool_rounds {
            let reply = self.model.complete(&system_prompt, history).await?;
            let calls: Vec<FunctionCall> =
                reply.function_calls().into_iter().cloned().collect();
            history.push(reply.clone());

            if calls.is_empty() {
                tracing::debug!(rounds = round, "turn complete");
                return Ok(reply.text_content());
            }

            let mut responses = Vec::with_capacity(calls.len());
            for call in &calls {
                let outcome = tools::execute(ctx, &call.name, &call.args).await;
                if outcome.is_error {
                    tracing::warn!(tool = %call.name, error = %outcome.content, "tool call failed");
                }
                let payload = if outcome.is_error {
                    json!({"error": outcome.content})
                } else {
                    json!({"result": outcome.content})
                };
                responses.push(Part::function_response(call.name.clone(), payload));
            }
            history.push(Content::function_responses(responses));
        }

        // Runaway guard: the model kept requesting tools. Close the turn
        // with a visible message instead of erroring out.
        tracing::warn!(
            max_rounds = self.max_tool_rounds,
            "turn exceeded tool round limit"
        );
        Ok("I wasn't able to finish that request within the allowed number of steps. \
            The changes made so far are saved; please ask again to continue."
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RatesConfig;
    use crate::itinerary::{self, TripDraft};
    use crate::rates::RateClient;
    use crate::store::TripStore;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Model that replays a fixed script of replies.
    struct ScriptedModel {
        replies: Mutex<VecDeque<Content>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Content>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, _system_prompt: &str, _history: &[Content]) -> Result<Content> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow!("script exhausted"))
        }
    }

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
                title: "Rome in spring".to_string(),
                destination: "Rome, Italy".to_string(),
                start_date: "2026-04-10".parse().unwrap(),
                end_date: "2026-04-12".parse().unwrap(),
                cover_image: None,
                coordinates: None,
                currency: Some("EUR".to_string()),
            }))
            .await
            .unwrap();
        let day_id = trip.days[0].id.clone();
        (store, trip.id, day_id)
    }

    #[tokio::test]
    async fn test_plain_text_turn() {
        let dir = TempDir::new().unwrap();
        let (store, trip_id, _) = seeded_store(&dir).await;
        let rates = rate_client();
        let ctx = ToolContext {
            store: &store,
            rates: &rates,
            trip_id: &trip_id,
        };

        let model = Arc::new(ScriptedModel::new(vec![Content::model_text(
            "Rome is lovely in April.",
        )]));
        let bridge = AssistantBridge::new(model, 4);

        let mut history = Vec::new();
        let reply = bridge
            .run_turn(&ctx, &mut history, "Tell me about Rome")
            .await
            .unwrap();
        assert_eq!(reply, "Rome is lovely in April.");
        // user message + model reply
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_tool_round_then_text() {
        let dir = TempDir::new().unwrap();
        let (store, trip_id, day_id) = seeded_store(&dir).await;
        let rates = rate_client();
        let ctx = ToolContext {
            store: &store,
            rates: &rates,
            trip_id: &trip_id,
        };

        let model = Arc::new(ScriptedModel::new(vec![
            Content {
                role: "model".to_string(),
                parts: vec![Part::function_call(
                    "add_activity",
                    json!({"day_id": day_id, "title": "Colosseum", "time": "10:00", "cost": 18.0}),
                )],
            },
            Content::model_text("Added the Colosseum visit."),
        ]));
        let bridge = AssistantBridge::new(model, 4);

        let mut history = Vec::new();
        let reply = bridge
            .run_turn(&ctx, &mut history, "Add the Colosseum on day 1")
            .await
            .unwrap();
        assert_eq!(reply, "Added the Colosseum visit.");

        let trip = store.get(&trip_id).await.unwrap();
        assert_eq!(trip.days[0].activities.len(), 1);
        assert_eq!(trip.days[0].activities[0].title, "Colosseum");

        // user, model(call), function responses, model(text)
        assert_eq!(history.len(), 4);
        assert!(history[2].parts[0].function_response.is_some());
    }

    #[tokio::test]
    async fn test_round_limit_yields_message_not_error() {
        let dir = TempDir::new().unwrap();
        let (store, trip_id, _) = seeded_store(&dir).await;
        let rates = rate_client();
        let ctx = ToolContext {
            store: &store,
            rates: &rates,
            trip_id: &trip_id,
        };

        // Every reply requests another tool call.
        let looping = Content {
            role: "model".to_string(),
            parts: vec![Part::function_call("get_trip_details", json!({}))],
        };
        let model = Arc::new(ScriptedModel::new(vec![looping.clone(), looping]));
        let bridge = AssistantBridge::new(model, 2);

        let mut history = Vec::new();
        let reply = bridge
            .run_turn(&ctx, &mut history, "loop forever")
            .await
            .unwrap();
        assert!(reply.contains("wasn't able to finish"));
    }
}

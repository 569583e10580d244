//! JSON HTTP API consumed by the browser frontend

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::assistant::{AssistantBridge, Content, GeminiClient, ToolContext, tools};
use crate::auth::{self, AuthProvider, User};
use crate::config::WayfarerConfig;
use crate::geocode::{GeocodingClient, Place};
use crate::itinerary::{self, ActivityDraft, ActivityPatch, TripDraft};
use crate::models::activity::parse_time_of_day;
use crate::models::{ActivityCategory, Coordinates, Day, Trip};
use crate::rates::RateClient;
use crate::store::TripStore;

/// Shared application state behind every handler
pub struct AppState {
    pub store: Arc<TripStore>,
    pub geocode: GeocodingClient,
    pub rates: Arc<RateClient>,
    pub auth: Arc<dyn AuthProvider>,
    /// Present only when an assistant API key is configured
    pub bridge: Option<AssistantBridge>,
    /// Per-trip conversation histories. Each history carries its own lock;
    /// the outer map lock is held only to look up or drop an entry.
    pub chats: RwLock<HashMap<String, Arc<Mutex<Vec<Content>>>>>,
}

impl AppState {
    /// Build the full application state from configuration.
    pub fn from_config(config: &WayfarerConfig) -> anyhow::Result<Self> {
        let store = Arc::new(TripStore::open(&config.store.location)?);
        let geocode = GeocodingClient::new(&config.geocoding)?;
        let rates = Arc::new(RateClient::new(&config.rates)?);

        let bridge = match GeminiClient::new(&config.assistant, &tools::definitions()) {
            Ok(client) => Some(AssistantBridge::new(
                Arc::new(client),
                config.assistant.max_tool_rounds as usize,
            )),
            Err(e) => {
                tracing::warn!(error = %e, "assistant disabled");
                None
            }
        };

        Ok(Self {
            store,
            geocode,
            rates,
            auth: auth::provider(),
            bridge,
            chats: RwLock::new(HashMap::new()),
        })
    }
}

#[derive(Serialize, Deserialize)]
pub struct ApiTrip {
    pub id: String,
    pub title: String,
    pub destination: String,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub days: Vec<Day>,
    pub cover_image: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub currency: String,
    pub total_cost: f64,
}

impl From<&Trip> for ApiTrip {
    fn from(trip: &Trip) -> Self {
        Self {
            id: trip.id.clone(),
            title: trip.title.clone(),
            destination: trip.destination.clone(),
            start_date: trip.start_date,
            end_date: trip.end_date,
            days: trip.days.clone(),
            cover_image: trip.cover_image.clone(),
            coordinates: trip.coordinates,
            currency: trip.currency.clone(),
            total_cost: itinerary::total_cost(trip),
        }
    }
}

#[derive(Deserialize)]
pub struct CreateTripRequest {
    pub title: String,
    pub destination: String,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub cover_image: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub currency: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ActivityRequest {
    pub title: Option<String>,
    /// HH:MM (24h)
    pub time: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub notes: Option<String>,
    pub cost: Option<f64>,
}

impl ActivityRequest {
    fn into_draft(self) -> Result<ActivityDraft, StatusCode> {
        let time = match self.time.as_deref() {
            Some(raw) => Some(parse_time_of_day(raw).ok_or(StatusCode::BAD_REQUEST)?),
            None => None,
        };
        let coordinates = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        };
        Ok(ActivityDraft {
            id: None,
            time,
            title: self.title,
            category: self
                .category
                .as_deref()
                .map(ActivityCategory::parse_lenient),
            location: self.location,
            coordinates,
            notes: self.notes,
            cost: self.cost,
        })
    }
}

#[derive(Deserialize)]
pub struct PlacesQuery {
    pub query: String,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Serialize, Deserialize)]
pub struct CostResponse {
    pub total_cost: f64,
    pub currency: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/trips", get(list_trips).post(create_trip))
        .route("/trips/{trip_id}", get(get_trip).delete(delete_trip))
        .route("/trips/{trip_id}/cost", get(trip_cost))
        .route(
            "/trips/{trip_id}/days/{day_id}/activities",
            post(add_activity),
        )
        .route(
            "/trips/{trip_id}/days/{day_id}/activities/{activity_id}",
            patch(update_activity).delete(remove_activity),
        )
        .route("/trips/{trip_id}/chat", post(chat))
        .route("/places", get(search_places))
        .route("/auth/me", get(current_user))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-out", post(sign_out))
        .with_state(state)
}

async fn list_trips(State(state): State<Arc<AppState>>) -> Json<Vec<ApiTrip>> {
    let trips = state.store.list().await;
    Json(trips.iter().map(ApiTrip::from).collect())
}

async fn create_trip(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateTripRequest>,
) -> Result<Json<ApiTrip>, StatusCode> {
    if payload.title.trim().is_empty() || payload.end_date < payload.start_date {
        return Err(StatusCode::BAD_REQUEST);
    }

    let coordinates = match (payload.latitude, payload.longitude) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
        _ => None,
    };
    let trip = itinerary::create_trip(TripDraft {
        title: payload.title,
        destination: payload.destination,
        start_date: payload.start_date,
        end_date: payload.end_date,
        cover_image: payload.cover_image,
        coordinates,
        currency: payload.currency,
    });

    let trip = state
        .store
        .create(trip)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(ApiTrip::from(&trip)))
}

async fn get_trip(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
) -> Result<Json<ApiTrip>, StatusCode> {
    match state.store.get(&trip_id).await {
        Some(trip) => Ok(Json(ApiTrip::from(&trip))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

async fn delete_trip(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let removed = state
        .store
        .delete(&trip_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if removed {
        // Drop any conversation tied to the deleted trip.
        state.chats.write().await.remove(&trip_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn trip_cost(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
) -> Result<Json<CostResponse>, StatusCode> {
    match state.store.get(&trip_id).await {
        Some(trip) => Ok(Json(CostResponse {
            total_cost: itinerary::total_cost(&trip),
            currency: trip.currency,
        })),
        None => Err(StatusCode::NOT_FOUND),
    }
}

async fn add_activity(
    State(state): State<Arc<AppState>>,
    Path((trip_id, day_id)): Path<(String, String)>,
    Json(payload): Json<ActivityRequest>,
) -> Result<Json<ApiTrip>, StatusCode> {
    let draft = payload.into_draft()?;

    let trip = state.store.get(&trip_id).await.ok_or(StatusCode::NOT_FOUND)?;
    if trip.day(&day_id).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    let updated = state
        .store
        .update(&trip_id, |t| itinerary::add_activity(t, &day_id, draft))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(ApiTrip::from(&updated)))
}

async fn update_activity(
    State(state): State<Arc<AppState>>,
    Path((trip_id, day_id, activity_id)): Path<(String, String, String)>,
    Json(payload): Json<ActivityRequest>,
) -> Result<Json<ApiTrip>, StatusCode> {
    let draft = payload.into_draft()?;
    let patch = ActivityPatch {
        time: draft.time,
        title: draft.title,
        category: draft.category,
        location: draft.location,
        coordinates: draft.coordinates,
        notes: draft.notes,
        cost: draft.cost,
    };

    let trip = state.store.get(&trip_id).await.ok_or(StatusCode::NOT_FOUND)?;
    let exists = trip
        .day(&day_id)
        .is_some_and(|d| d.activities.iter().any(|a| a.id == activity_id));
    if !exists {
        return Err(StatusCode::NOT_FOUND);
    }

    let updated = state
        .store
        .update(&trip_id, |t| {
            itinerary::update_activity(t, &day_id, &activity_id, patch)
        })
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(ApiTrip::from(&updated)))
}

async fn remove_activity(
    State(state): State<Arc<AppState>>,
    Path((trip_id, day_id, activity_id)): Path<(String, String, String)>,
) -> Result<Json<ApiTrip>, StatusCode> {
    let updated = state
        .store
        .update(&trip_id, |t| {
            itinerary::remove_activity(t, &day_id, &activity_id)
        })
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(ApiTrip::from(&updated)))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, StatusCode> {
    let Some(bridge) = state.bridge.as_ref() else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };
    if state.store.get(&trip_id).await.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    let ctx = ToolContext {
        store: state.store.as_ref(),
        rates: state.rates.as_ref(),
        trip_id: &trip_id,
    };

    // The map lock is held only for the entry lookup; the turn itself runs
    // under the per-trip history lock, so turns on other trips proceed.
    let entry = {
        let mut chats = state.chats.write().await;
        Arc::clone(chats.entry(trip_id.clone()).or_default())
    };
    let mut history = entry.lock().await;

    // A failed model call becomes a visible message rather than aborting
    // the conversation.
    let reply = match bridge.run_turn(&ctx, &mut history, &payload.message).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(error = %e, "assistant turn failed");
            format!("The assistant is unavailable right now: {e}")
        }
    };
    Ok(Json(ChatResponse { reply }))
}

async fn search_places(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlacesQuery>,
) -> Result<Json<Vec<Place>>, StatusCode> {
    if params.query.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let places = state
        .geocode
        .search(&params.query)
        .await
        .map_err(|_| StatusCode::BAD_GATEWAY)?;
    Ok(Json(places))
}

async fn current_user(State(state): State<Arc<AppState>>) -> Json<Option<User>> {
    Json(state.auth.current_user())
}

async fn sign_in(State(state): State<Arc<AppState>>) -> Result<Json<User>, StatusCode> {
    state
        .auth
        .sign_in()
        .await
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn sign_out(State(state): State<Arc<AppState>>) -> Result<StatusCode, StatusCode> {
    state
        .auth
        .sign_out()
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

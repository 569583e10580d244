//! Trip store: in-memory trip collection with key-value persistence
//!
//! Trips are held in memory and written through to a local fjall keyspace as
//! a single JSON array under a fixed key. The array is loaded once at
//! startup; malformed or structurally invalid entries are discarded with a
//! warning rather than failing the load. The key is rewritten on every
//! trip-list change and removed entirely when the list becomes empty.

use anyhow::{Context, Result};
use fjall::Keyspace;
use std::path::Path;
use tokio::sync::RwLock;
use tokio::task;

use crate::WayfarerError;
use crate::models::Trip;

/// Fixed key holding the serialized trip array
const TRIPS_KEY: &str = "trips";

pub struct TripStore {
    partition: Keyspace,
    trips: RwLock<Vec<Trip>>,
}

fn load_trips(partition: &Keyspace) -> Result<Vec<Trip>> {
    let Some(bytes) = partition.get(TRIPS_KEY)? else {
        return Ok(Vec::new());
    };

    // Each entry is validated independently so one bad record cannot take
    // down the whole collection.
    let entries: Vec<serde_json::Value> = match serde_json::from_slice(&bytes) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = %e, "stored trip list is not a JSON array, starting empty");
            return Ok(Vec::new());
        }
    };

    let mut trips = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<Trip>(entry) {
            Ok(trip) if trip.days_are_consistent() => trips.push(trip),
            Ok(trip) => {
                tracing::warn!(trip_id = %trip.id, "discarding trip with inconsistent day coverage");
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding malformed trip record");
            }
        }
    }
    Ok(trips)
}

impl TripStore {
    /// Open the trip database at the given path and load all valid trips.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path)
            .open()
            .context("Failed to open trip database")?;
        let partition = db.keyspace("trips", fjall::KeyspaceCreateOptions::default)?;
        let trips = load_trips(&partition)?;
        tracing::info!(count = trips.len(), "trip store loaded");
        Ok(Self {
            partition,
            trips: RwLock::new(trips),
        })
    }

    /// All trips, in creation order.
    pub async fn list(&self) -> Vec<Trip> {
        self.trips.read().await.clone()
    }

    /// Look up a trip by identifier.
    pub async fn get(&self, trip_id: &str) -> Option<Trip> {
        self.trips
            .read()
            .await
            .iter()
            .find(|t| t.id == trip_id)
            .cloned()
    }

    /// Add a new trip and persist the collection.
    #[tracing::instrument(name = "create_trip", level = "debug", skip(self, trip), fields(trip_id = %trip.id))]
    pub async fn create(&self, trip: Trip) -> Result<Trip> {
        let mut trips = self.trips.write().await;
        trips.push(trip.clone());
        self.persist(&trips).await?;
        Ok(trip)
    }

    /// Apply a mutation to the matching trip and persist the collection.
    /// Returns `None` without persisting if the trip does not exist.
    pub async fn update<F>(&self, trip_id: &str, mutate: F) -> Result<Option<Trip>>
    where
        F: FnOnce(Trip) -> Trip,
    {
        let mut trips = self.trips.write().await;
        let Some(index) = trips.iter().position(|t| t.id == trip_id) else {
            return Ok(None);
        };

        let updated = mutate(trips[index].clone());
        trips[index] = updated.clone();
        self.persist(&trips).await?;
        Ok(Some(updated))
    }

    /// Delete a trip (and transitively its days and activities).
    /// Returns whether a trip was removed.
    #[tracing::instrument(name = "delete_trip", level = "debug", skip(self))]
    pub async fn delete(&self, trip_id: &str) -> Result<bool> {
        let mut trips = self.trips.write().await;
        let before = trips.len();
        trips.retain(|t| t.id != trip_id);
        if trips.len() == before {
            return Ok(false);
        }
        self.persist(&trips).await?;
        Ok(true)
    }

    /// Rewrite the stored array, or remove the key when the list is empty.
    /// A failed write is an error: callers must not report success for a
    /// change that never reached disk.
    async fn persist(&self, trips: &[Trip]) -> Result<()> {
        let partition = self.partition.clone();
        let write = if trips.is_empty() {
            task::spawn_blocking(move || partition.remove(TRIPS_KEY).map(|_| ())).await?
        } else {
            let bytes = serde_json::to_vec(trips).context("Failed to serialize trips")?;
            task::spawn_blocking(move || partition.insert(TRIPS_KEY, bytes).map(|_| ())).await?
        };
        write.map_err(|e| WayfarerError::store(format!("Failed to write trip list: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itinerary::{self, ActivityDraft, TripDraft};
    use tempfile::TempDir;

    fn draft(title: &str) -> TripDraft {
        TripDraft {
            title: title.to_string(),
            destination: "Kyoto, Japan".to_string(),
            start_date: "2026-04-01".parse().unwrap(),
            end_date: "2026-04-05".parse().unwrap(),
            cover_image: None,
            coordinates: None,
            currency: Some("JPY".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_reload() {
        let dir = TempDir::new().unwrap();
        {
            let store = TripStore::open(dir.path()).unwrap();
            store
                .create(itinerary::create_trip(draft("Cherry blossoms")))
                .await
                .unwrap();
            store
                .create(itinerary::create_trip(draft("Autumn leaves")))
                .await
                .unwrap();
        }

        let store = TripStore::open(dir.path()).unwrap();
        let trips = store.list().await;
        assert_eq!(trips.len(), 2);
        assert_eq!(trips[0].title, "Cherry blossoms");
        assert_eq!(trips[0].days.len(), 5);
    }

    #[tokio::test]
    async fn test_delete_last_trip_clears_stored_state() {
        let dir = TempDir::new().unwrap();
        let trip_id;
        {
            let store = TripStore::open(dir.path()).unwrap();
            let trip = store
                .create(itinerary::create_trip(draft("Solo trip")))
                .await
                .unwrap();
            trip_id = trip.id.clone();
            assert!(store.delete(&trip_id).await.unwrap());
            // Key must be gone once the list is empty.
            assert!(store.partition.get(TRIPS_KEY).unwrap().is_none());
        }

        let store = TripStore::open(dir.path()).unwrap();
        assert!(store.list().await.is_empty());
        assert!(!store.delete(&trip_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_successful_update_is_durable_across_reopen() {
        let dir = TempDir::new().unwrap();
        let trip_id;
        let day_id;
        {
            let store = TripStore::open(dir.path()).unwrap();
            let trip = store
                .create(itinerary::create_trip(draft("Street food")))
                .await
                .unwrap();
            trip_id = trip.id.clone();
            day_id = trip.days[0].id.clone();

            let updated = store
                .update(&trip_id, |t| {
                    itinerary::add_activity(
                        t,
                        &day_id,
                        ActivityDraft {
                            title: Some("Ramen at Ichiran".to_string()),
                            ..Default::default()
                        },
                    )
                })
                .await
                .unwrap();
            // Reported success means the write-through happened.
            assert!(updated.is_some());
        }

        let store = TripStore::open(dir.path()).unwrap();
        let trip = store.get(&trip_id).await.unwrap();
        assert_eq!(
            trip.day(&day_id).unwrap().activities[0].title,
            "Ramen at Ichiran"
        );
    }

    #[tokio::test]
    async fn test_update_missing_trip_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = TripStore::open(dir.path()).unwrap();
        let result = store.update("no-such-trip", |t| t).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_malformed_entries_are_discarded_on_load() {
        let dir = TempDir::new().unwrap();
        let valid = itinerary::create_trip(draft("Valid"));

        {
            let store = TripStore::open(dir.path()).unwrap();
            // Write an array mixing a valid record, garbage, and a record
            // violating the day-coverage invariant.
            let mut broken = valid.clone();
            broken.id = "broken".to_string();
            broken.days.remove(1);

            let payload = serde_json::json!([
                valid,
                {"id": 42, "not_a_trip": true},
                broken,
            ]);
            store
                .partition
                .insert(TRIPS_KEY, serde_json::to_vec(&payload).unwrap())
                .unwrap();
        }

        let store = TripStore::open(dir.path()).unwrap();
        let trips = store.list().await;
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].id, valid.id);
    }

    #[tokio::test]
    async fn test_non_array_payload_starts_empty() {
        let dir = TempDir::new().unwrap();
        {
            let store = TripStore::open(dir.path()).unwrap();
            store.partition.insert(TRIPS_KEY, b"not json".to_vec()).unwrap();
        }
        let store = TripStore::open(dir.path()).unwrap();
        assert!(store.list().await.is_empty());
    }
}

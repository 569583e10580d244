//! Currency exchange rates from the Frankfurter API
//!
//! Rates change slowly, so successful lookups are cached in memory with a
//! configurable TTL. Lookup failures are returned as errors; the assistant
//! bridge converts them into textual results so a failed rate lookup never
//! terminates a conversation turn.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::WayfarerError;
use crate::config::RatesConfig;

struct CachedRate {
    rate: f64,
    expires_at: Instant,
}

pub struct RateClient {
    http: reqwest::Client,
    base_url: String,
    ttl: Duration,
    cache: RwLock<HashMap<(String, String), CachedRate>>,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    rates: HashMap<String, f64>,
}

fn validate_currency_code(code: &str) -> Result<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(WayfarerError::validation(format!(
            "'{code}' is not a valid ISO 4217 currency code"
        ))
        .into());
    }
    Ok(code)
}

impl RateClient {
    pub fn new(config: &RatesConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_seconds)))
            .build()
            .context("Failed to build rates HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ttl: Duration::from_secs(u64::from(config.cache_ttl_minutes) * 60),
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Fetch the conversion rate from one currency to another.
    #[tracing::instrument(name = "get_rate", level = "debug", skip(self))]
    pub async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let from = validate_currency_code(from)?;
        let to = validate_currency_code(to)?;
        if from == to {
            return Ok(1.0);
        }

        let key = (from.clone(), to.clone());
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&key) {
                if entry.expires_at > Instant::now() {
                    tracing::debug!("rate served from cache");
                    return Ok(entry.rate);
                }
            }
        }

        let url = format!("{}/latest?base={from}&symbols={to}", self.base_url);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(WayfarerError::api(format!(
                "Rate service returned HTTP {} for {from}->{to}",
                response.status()
            ))
            .into());
        }

        let body: LatestResponse = response
            .json()
            .await
            .with_context(|| "Failed to parse exchange rate response")?;
        let rate = body.rates.get(&to).copied().ok_or_else(|| {
            WayfarerError::api(format!("No rate available for {from}->{to}"))
        })?;

        let mut cache = self.cache.write().await;
        cache.insert(
            key,
            CachedRate {
                rate,
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(rate)
    }
}

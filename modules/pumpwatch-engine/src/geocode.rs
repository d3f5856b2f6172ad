//! Station address geocoding.
//!
//! Best-effort collaborator: a failed or empty lookup is recovered by
//! the pipeline's fallback policy, never surfaced as a submission
//! failure.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use pumpwatch_common::{GeoPoint, PumpWatchError};

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a free-text address to coordinates. `Ok(None)` means the
    /// service answered but found no match.
    async fn resolve(&self, address: &str) -> Result<Option<GeoPoint>, PumpWatchError>;
}

#[derive(Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
}

/// Nominatim-compatible geocoding client.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    endpoint: String,
}

impl NominatimGeocoder {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn resolve(&self, address: &str) -> Result<Option<GeoPoint>, PumpWatchError> {
        if address.len() > 200 {
            return Err(PumpWatchError::Geocoding(
                "address too long (max 200 chars)".to_string(),
            ));
        }

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .header("User-Agent", "pumpwatch/1.0")
            .timeout(Self::REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| PumpWatchError::Geocoding(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(PumpWatchError::Geocoding(format!(
                "geocoding API returned {}",
                resp.status()
            )));
        }

        let results: Vec<NominatimResult> = resp
            .json()
            .await
            .map_err(|e| PumpWatchError::Geocoding(e.to_string()))?;

        let Some(first) = results.into_iter().next() else {
            return Ok(None);
        };

        let lat: f64 = first
            .lat
            .parse()
            .map_err(|_| PumpWatchError::Geocoding(format!("bad latitude '{}'", first.lat)))?;
        let lon: f64 = first
            .lon
            .parse()
            .map_err(|_| PumpWatchError::Geocoding(format!("bad longitude '{}'", first.lon)))?;

        Ok(Some(GeoPoint { lat, lon }))
    }
}

#[async_trait]
impl<G: Geocoder + ?Sized> Geocoder for std::sync::Arc<G> {
    async fn resolve(&self, address: &str) -> Result<Option<GeoPoint>, PumpWatchError> {
        (**self).resolve(address).await
    }
}

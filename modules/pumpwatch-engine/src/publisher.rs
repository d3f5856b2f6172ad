//! Writes the externally visible verified-availability record.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use pumpwatch_common::{FuelType, PumpWatchError, VerifiedFuelRecord};
use pumpwatch_store::RecordStore;

/// Upserts the (station, fuel) availability record. Last-write-wins:
/// no merging of old and new confidence.
pub struct VerificationPublisher<S> {
    store: S,
}

impl<S: RecordStore> VerificationPublisher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn publish(
        &self,
        station_id: Uuid,
        fuel_type: FuelType,
        confidence: f64,
        verified_by_count: u32,
        now: DateTime<Utc>,
    ) -> Result<VerifiedFuelRecord, PumpWatchError> {
        let record = VerifiedFuelRecord {
            station_id,
            fuel_type,
            available: true,
            confidence,
            verified_by_count,
            last_verified_at: now,
        };
        self.store.upsert_verified(&record).await?;
        tracing::info!(
            %station_id,
            fuel = %fuel_type,
            confidence,
            verified_by_count,
            "published verified availability"
        );
        Ok(record)
    }
}

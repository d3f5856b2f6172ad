//! In-memory store for tests and embedding. No database required.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use pumpwatch_common::{
    FuelReport, FuelType, GeoPoint, Station, TrustRecord, VerifiedFuelRecord,
};

use crate::{RecordStore, StoreResult};

#[derive(Default)]
struct Inner {
    stations: HashMap<Uuid, Station>,
    trust: HashMap<String, TrustRecord>,
    /// Insertion order preserved so admin reads are stable.
    reports: Vec<FuelReport>,
    verified: HashMap<(Uuid, FuelType), VerifiedFuelRecord>,
}

/// Thread-safe in-memory [`RecordStore`].
///
/// A single mutex guards all tables; the verified upsert replaces the
/// whole record in one step, so concurrent publishes are
/// last-write-wins, never a field mix.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a station, replacing any existing one with the same id.
    pub fn seed_station(&self, station: Station) {
        self.inner
            .lock()
            .unwrap()
            .stations
            .insert(station.id, station);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn station(&self, id: Uuid) -> StoreResult<Option<Station>> {
        Ok(self.inner.lock().unwrap().stations.get(&id).cloned())
    }

    async fn set_station_coords(&self, id: Uuid, coords: GeoPoint) -> StoreResult<()> {
        if let Some(station) = self.inner.lock().unwrap().stations.get_mut(&id) {
            station.coords = Some(coords);
        }
        Ok(())
    }

    async fn trust_record(&self, user_id: &str) -> StoreResult<Option<TrustRecord>> {
        Ok(self.inner.lock().unwrap().trust.get(user_id).cloned())
    }

    async fn insert_trust_record(&self, record: &TrustRecord) -> StoreResult<()> {
        self.inner
            .lock()
            .unwrap()
            .trust
            .insert(record.user_id.clone(), record.clone());
        Ok(())
    }

    async fn update_trust_record(&self, record: &TrustRecord) -> StoreResult<()> {
        self.inner
            .lock()
            .unwrap()
            .trust
            .insert(record.user_id.clone(), record.clone());
        Ok(())
    }

    async fn insert_report(&self, report: &FuelReport) -> StoreResult<()> {
        self.inner.lock().unwrap().reports.push(report.clone());
        Ok(())
    }

    async fn mark_report_verified(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(report) = inner.reports.iter_mut().find(|r| r.id == id) {
            report.verified = true;
        }
        Ok(())
    }

    async fn accepted_unverified_reports(
        &self,
        station_id: Uuid,
        fuel_type: FuelType,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<FuelReport>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .reports
            .iter()
            .filter(|r| {
                r.station_id == station_id
                    && r.fuel_type == fuel_type
                    && r.is_pending()
                    && r.submitted_at >= since
            })
            .cloned()
            .collect())
    }

    async fn pending_reports(&self) -> StoreResult<Vec<FuelReport>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .reports
            .iter()
            .filter(|r| r.is_pending())
            .cloned()
            .collect())
    }

    async fn upsert_verified(&self, record: &VerifiedFuelRecord) -> StoreResult<()> {
        self.inner
            .lock()
            .unwrap()
            .verified
            .insert((record.station_id, record.fuel_type), record.clone());
        Ok(())
    }

    async fn verified_record(
        &self,
        station_id: Uuid,
        fuel_type: FuelType,
    ) -> StoreResult<Option<VerifiedFuelRecord>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .verified
            .get(&(station_id, fuel_type))
            .cloned())
    }

    async fn all_reports(&self) -> StoreResult<Vec<FuelReport>> {
        Ok(self.inner.lock().unwrap().reports.clone())
    }

    async fn all_trust_records(&self) -> StoreResult<Vec<TrustRecord>> {
        Ok(self.inner.lock().unwrap().trust.values().cloned().collect())
    }

    async fn all_verified(&self) -> StoreResult<Vec<VerifiedFuelRecord>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .verified
            .values()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pumpwatch_common::ScoreBreakdown;

    fn verified(station_id: Uuid, confidence: f64, count: u32) -> VerifiedFuelRecord {
        VerifiedFuelRecord {
            station_id,
            fuel_type: FuelType::Diesel,
            available: true,
            confidence,
            verified_by_count: count,
            last_verified_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_replaces_the_whole_record() {
        let store = MemoryStore::new();
        let station_id = Uuid::new_v4();

        store.upsert_verified(&verified(station_id, 0.5, 1)).await.unwrap();
        store.upsert_verified(&verified(station_id, 0.9, 3)).await.unwrap();

        let record = store
            .verified_record(station_id, FuelType::Diesel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.confidence, 0.9);
        assert_eq!(record.verified_by_count, 3);
        assert_eq!(store.all_verified().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn pending_scan_excludes_rejected_and_verified() {
        let store = MemoryStore::new();
        let station_id = Uuid::new_v4();
        let base = FuelReport {
            id: Uuid::new_v4(),
            station_id,
            fuel_type: FuelType::Diesel,
            user_id: "device-1".to_string(),
            user_coords: GeoPoint { lat: 6.9, lon: 79.8 },
            manual_location: false,
            submitted_at: Utc::now(),
            breakdown: ScoreBreakdown {
                trust: 0.5,
                recency_factor: 1.0,
                proximity_factor: 1.0,
                score: 0.45,
            },
            rejected: false,
            rejection_reason: None,
            verified: false,
        };

        store.insert_report(&base).await.unwrap();
        store
            .insert_report(&FuelReport {
                id: Uuid::new_v4(),
                rejected: true,
                ..base.clone()
            })
            .await
            .unwrap();
        let verified_id = Uuid::new_v4();
        store
            .insert_report(&FuelReport {
                id: verified_id,
                ..base.clone()
            })
            .await
            .unwrap();
        store.mark_report_verified(verified_id).await.unwrap();

        let pending = store.pending_reports().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, base.id);

        let grouped = store
            .accepted_unverified_reports(
                station_id,
                FuelType::Diesel,
                Utc::now() - chrono::Duration::hours(1),
            )
            .await
            .unwrap();
        assert_eq!(grouped.len(), 1);
    }
}

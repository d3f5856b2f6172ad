//! Record store seam for the verification engine.
//!
//! The engine talks to persistence through the [`RecordStore`] trait.
//! Production uses [`PgStore`] (Postgres via sqlx); tests embed
//! [`MemoryStore`], which needs no database.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use pumpwatch_common::{
    FuelReport, FuelType, GeoPoint, PumpWatchError, Station, TrustRecord, VerifiedFuelRecord,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, PumpWatchError>;

/// Typed persistence operations over the four verification entities.
///
/// Implementations must make `upsert_verified` atomic per
/// (station, fuel) key: concurrent upserts may land in either order,
/// but the stored record is always exactly one caller's write, never a
/// mix of fields.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // -- stations --
    async fn station(&self, id: Uuid) -> StoreResult<Option<Station>>;

    /// Backfill geocoded coordinates onto a station.
    async fn set_station_coords(&self, id: Uuid, coords: GeoPoint) -> StoreResult<()>;

    // -- trust --
    async fn trust_record(&self, user_id: &str) -> StoreResult<Option<TrustRecord>>;
    async fn insert_trust_record(&self, record: &TrustRecord) -> StoreResult<()>;
    async fn update_trust_record(&self, record: &TrustRecord) -> StoreResult<()>;

    // -- reports --
    async fn insert_report(&self, report: &FuelReport) -> StoreResult<()>;
    async fn mark_report_verified(&self, id: Uuid) -> StoreResult<()>;

    /// Accepted, not-yet-verified reports for a (station, fuel) pair
    /// submitted at or after `since`.
    async fn accepted_unverified_reports(
        &self,
        station_id: Uuid,
        fuel_type: FuelType,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<FuelReport>>;

    /// Every report that is neither verified nor rejected.
    async fn pending_reports(&self) -> StoreResult<Vec<FuelReport>>;

    // -- verified availability --
    async fn upsert_verified(&self, record: &VerifiedFuelRecord) -> StoreResult<()>;
    async fn verified_record(
        &self,
        station_id: Uuid,
        fuel_type: FuelType,
    ) -> StoreResult<Option<VerifiedFuelRecord>>;

    // -- admin reads --
    async fn all_reports(&self) -> StoreResult<Vec<FuelReport>>;
    async fn all_trust_records(&self) -> StoreResult<Vec<TrustRecord>>;
    async fn all_verified(&self) -> StoreResult<Vec<VerifiedFuelRecord>>;
}

// Arc blanket, lets tests share the store for assertions.
#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for std::sync::Arc<S> {
    async fn station(&self, id: Uuid) -> StoreResult<Option<Station>> {
        (**self).station(id).await
    }

    async fn set_station_coords(&self, id: Uuid, coords: GeoPoint) -> StoreResult<()> {
        (**self).set_station_coords(id, coords).await
    }

    async fn trust_record(&self, user_id: &str) -> StoreResult<Option<TrustRecord>> {
        (**self).trust_record(user_id).await
    }

    async fn insert_trust_record(&self, record: &TrustRecord) -> StoreResult<()> {
        (**self).insert_trust_record(record).await
    }

    async fn update_trust_record(&self, record: &TrustRecord) -> StoreResult<()> {
        (**self).update_trust_record(record).await
    }

    async fn insert_report(&self, report: &FuelReport) -> StoreResult<()> {
        (**self).insert_report(report).await
    }

    async fn mark_report_verified(&self, id: Uuid) -> StoreResult<()> {
        (**self).mark_report_verified(id).await
    }

    async fn accepted_unverified_reports(
        &self,
        station_id: Uuid,
        fuel_type: FuelType,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<FuelReport>> {
        (**self)
            .accepted_unverified_reports(station_id, fuel_type, since)
            .await
    }

    async fn pending_reports(&self) -> StoreResult<Vec<FuelReport>> {
        (**self).pending_reports().await
    }

    async fn upsert_verified(&self, record: &VerifiedFuelRecord) -> StoreResult<()> {
        (**self).upsert_verified(record).await
    }

    async fn verified_record(
        &self,
        station_id: Uuid,
        fuel_type: FuelType,
    ) -> StoreResult<Option<VerifiedFuelRecord>> {
        (**self).verified_record(station_id, fuel_type).await
    }

    async fn all_reports(&self) -> StoreResult<Vec<FuelReport>> {
        (**self).all_reports().await
    }

    async fn all_trust_records(&self) -> StoreResult<Vec<TrustRecord>> {
        (**self).all_trust_records().await
    }

    async fn all_verified(&self) -> StoreResult<Vec<VerifiedFuelRecord>> {
        (**self).all_verified().await
    }
}

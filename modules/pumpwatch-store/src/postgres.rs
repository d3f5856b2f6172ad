//! Postgres-backed store.
//!
//! Table names and columns follow the deployed schema
//! (`fuel_stations`, `crowdsourced_reports`, `user_trust_scores`,
//! `verified_fuel_data`). The verified upsert relies on
//! `ON CONFLICT (station_id, fuel_type)` so concurrent promotions for
//! one key resolve to a single writer's row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use pumpwatch_common::{
    FuelReport, FuelType, GeoPoint, PumpWatchError, ScoreBreakdown, Station, TrustRecord,
    VerifiedFuelRecord,
};

use crate::{RecordStore, StoreResult};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url).await.map_err(db_err)?;
        Ok(Self::new(pool))
    }

    /// Create the verification tables if they don't exist yet.
    pub async fn migrate(&self) -> StoreResult<()> {
        for ddl in [
            "CREATE TABLE IF NOT EXISTS fuel_stations (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                address TEXT NOT NULL,
                lat DOUBLE PRECISION,
                lon DOUBLE PRECISION,
                legacy_id BIGINT
            )",
            "CREATE TABLE IF NOT EXISTS crowdsourced_reports (
                id UUID PRIMARY KEY,
                station_id UUID NOT NULL REFERENCES fuel_stations(id),
                fuel_type TEXT NOT NULL,
                anonymous_user_id TEXT NOT NULL,
                user_lat DOUBLE PRECISION NOT NULL,
                user_lon DOUBLE PRECISION NOT NULL,
                is_manual_location BOOLEAN NOT NULL DEFAULT FALSE,
                submitted_at TIMESTAMPTZ NOT NULL,
                trust_score_at_submission DOUBLE PRECISION NOT NULL,
                time_decay_factor DOUBLE PRECISION NOT NULL,
                location_factor DOUBLE PRECISION NOT NULL,
                dve_score DOUBLE PRECISION NOT NULL,
                is_rejected BOOLEAN NOT NULL DEFAULT FALSE,
                rejection_reason TEXT,
                is_verified BOOLEAN NOT NULL DEFAULT FALSE
            )",
            "CREATE TABLE IF NOT EXISTS user_trust_scores (
                anonymous_user_id TEXT PRIMARY KEY,
                trust_score DOUBLE PRECISION NOT NULL,
                total_reports INT NOT NULL DEFAULT 0,
                correct_reports INT NOT NULL DEFAULT 0,
                incorrect_reports INT NOT NULL DEFAULT 0,
                updated_at TIMESTAMPTZ NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS verified_fuel_data (
                station_id UUID NOT NULL REFERENCES fuel_stations(id),
                fuel_type TEXT NOT NULL,
                is_available BOOLEAN NOT NULL,
                confidence_score DOUBLE PRECISION NOT NULL,
                verified_by_count INT NOT NULL,
                last_verified_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (station_id, fuel_type)
            )",
        ] {
            sqlx::query(ddl).execute(&self.pool).await.map_err(db_err)?;
        }
        tracing::debug!("verification tables ensured");
        Ok(())
    }
}

fn db_err(e: sqlx::Error) -> PumpWatchError {
    PumpWatchError::Database(e.to_string())
}

fn station_from_row(row: &PgRow) -> Result<Station, PumpWatchError> {
    let lat: Option<f64> = row.try_get("lat").map_err(db_err)?;
    let lon: Option<f64> = row.try_get("lon").map_err(db_err)?;
    Ok(Station {
        id: row.try_get("id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        address: row.try_get("address").map_err(db_err)?,
        coords: match (lat, lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint { lat, lon }),
            _ => None,
        },
        legacy_id: row.try_get("legacy_id").map_err(db_err)?,
    })
}

fn report_from_row(row: &PgRow) -> Result<FuelReport, PumpWatchError> {
    let fuel: String = row.try_get("fuel_type").map_err(db_err)?;
    Ok(FuelReport {
        id: row.try_get("id").map_err(db_err)?,
        station_id: row.try_get("station_id").map_err(db_err)?,
        fuel_type: fuel.parse()?,
        user_id: row.try_get("anonymous_user_id").map_err(db_err)?,
        user_coords: GeoPoint {
            lat: row.try_get("user_lat").map_err(db_err)?,
            lon: row.try_get("user_lon").map_err(db_err)?,
        },
        manual_location: row.try_get("is_manual_location").map_err(db_err)?,
        submitted_at: row.try_get("submitted_at").map_err(db_err)?,
        breakdown: ScoreBreakdown {
            trust: row.try_get("trust_score_at_submission").map_err(db_err)?,
            recency_factor: row.try_get("time_decay_factor").map_err(db_err)?,
            proximity_factor: row.try_get("location_factor").map_err(db_err)?,
            score: row.try_get("dve_score").map_err(db_err)?,
        },
        rejected: row.try_get("is_rejected").map_err(db_err)?,
        rejection_reason: row.try_get("rejection_reason").map_err(db_err)?,
        verified: row.try_get("is_verified").map_err(db_err)?,
    })
}

fn trust_from_row(row: &PgRow) -> Result<TrustRecord, PumpWatchError> {
    let total: i32 = row.try_get("total_reports").map_err(db_err)?;
    let correct: i32 = row.try_get("correct_reports").map_err(db_err)?;
    let incorrect: i32 = row.try_get("incorrect_reports").map_err(db_err)?;
    Ok(TrustRecord {
        user_id: row.try_get("anonymous_user_id").map_err(db_err)?,
        trust_score: row.try_get("trust_score").map_err(db_err)?,
        total_reports: total as u32,
        correct_reports: correct as u32,
        incorrect_reports: incorrect as u32,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn verified_from_row(row: &PgRow) -> Result<VerifiedFuelRecord, PumpWatchError> {
    let fuel: String = row.try_get("fuel_type").map_err(db_err)?;
    let count: i32 = row.try_get("verified_by_count").map_err(db_err)?;
    Ok(VerifiedFuelRecord {
        station_id: row.try_get("station_id").map_err(db_err)?,
        fuel_type: fuel.parse()?,
        available: row.try_get("is_available").map_err(db_err)?,
        confidence: row.try_get("confidence_score").map_err(db_err)?,
        verified_by_count: count as u32,
        last_verified_at: row.try_get("last_verified_at").map_err(db_err)?,
    })
}

#[async_trait]
impl RecordStore for PgStore {
    async fn station(&self, id: Uuid) -> StoreResult<Option<Station>> {
        let row = sqlx::query(
            "SELECT id, name, address, lat, lon, legacy_id FROM fuel_stations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(station_from_row).transpose()
    }

    async fn set_station_coords(&self, id: Uuid, coords: GeoPoint) -> StoreResult<()> {
        sqlx::query("UPDATE fuel_stations SET lat = $2, lon = $3 WHERE id = $1")
            .bind(id)
            .bind(coords.lat)
            .bind(coords.lon)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn trust_record(&self, user_id: &str) -> StoreResult<Option<TrustRecord>> {
        let row = sqlx::query(
            "SELECT anonymous_user_id, trust_score, total_reports, correct_reports, \
             incorrect_reports, updated_at FROM user_trust_scores WHERE anonymous_user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(trust_from_row).transpose()
    }

    async fn insert_trust_record(&self, record: &TrustRecord) -> StoreResult<()> {
        // First report wins if two submissions race to create the record.
        sqlx::query(
            "INSERT INTO user_trust_scores \
             (anonymous_user_id, trust_score, total_reports, correct_reports, incorrect_reports, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (anonymous_user_id) DO NOTHING",
        )
        .bind(&record.user_id)
        .bind(record.trust_score)
        .bind(record.total_reports as i32)
        .bind(record.correct_reports as i32)
        .bind(record.incorrect_reports as i32)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn update_trust_record(&self, record: &TrustRecord) -> StoreResult<()> {
        sqlx::query(
            "UPDATE user_trust_scores SET trust_score = $2, total_reports = $3, \
             correct_reports = $4, incorrect_reports = $5, updated_at = $6 \
             WHERE anonymous_user_id = $1",
        )
        .bind(&record.user_id)
        .bind(record.trust_score)
        .bind(record.total_reports as i32)
        .bind(record.correct_reports as i32)
        .bind(record.incorrect_reports as i32)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn insert_report(&self, report: &FuelReport) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO crowdsourced_reports \
             (id, station_id, fuel_type, anonymous_user_id, user_lat, user_lon, \
              is_manual_location, submitted_at, trust_score_at_submission, time_decay_factor, \
              location_factor, dve_score, is_rejected, rejection_reason, is_verified) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(report.id)
        .bind(report.station_id)
        .bind(report.fuel_type.as_str())
        .bind(&report.user_id)
        .bind(report.user_coords.lat)
        .bind(report.user_coords.lon)
        .bind(report.manual_location)
        .bind(report.submitted_at)
        .bind(report.breakdown.trust)
        .bind(report.breakdown.recency_factor)
        .bind(report.breakdown.proximity_factor)
        .bind(report.breakdown.score)
        .bind(report.rejected)
        .bind(&report.rejection_reason)
        .bind(report.verified)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn mark_report_verified(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE crowdsourced_reports SET is_verified = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn accepted_unverified_reports(
        &self,
        station_id: Uuid,
        fuel_type: FuelType,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<FuelReport>> {
        let rows = sqlx::query(
            "SELECT * FROM crowdsourced_reports \
             WHERE station_id = $1 AND fuel_type = $2 AND is_rejected = FALSE \
             AND is_verified = FALSE AND submitted_at >= $3",
        )
        .bind(station_id)
        .bind(fuel_type.as_str())
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(report_from_row).collect()
    }

    async fn pending_reports(&self) -> StoreResult<Vec<FuelReport>> {
        let rows = sqlx::query(
            "SELECT * FROM crowdsourced_reports \
             WHERE is_rejected = FALSE AND is_verified = FALSE",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(report_from_row).collect()
    }

    async fn upsert_verified(&self, record: &VerifiedFuelRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO verified_fuel_data \
             (station_id, fuel_type, is_available, confidence_score, verified_by_count, last_verified_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (station_id, fuel_type) DO UPDATE SET \
             is_available = EXCLUDED.is_available, \
             confidence_score = EXCLUDED.confidence_score, \
             verified_by_count = EXCLUDED.verified_by_count, \
             last_verified_at = EXCLUDED.last_verified_at",
        )
        .bind(record.station_id)
        .bind(record.fuel_type.as_str())
        .bind(record.available)
        .bind(record.confidence)
        .bind(record.verified_by_count as i32)
        .bind(record.last_verified_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn verified_record(
        &self,
        station_id: Uuid,
        fuel_type: FuelType,
    ) -> StoreResult<Option<VerifiedFuelRecord>> {
        let row = sqlx::query(
            "SELECT * FROM verified_fuel_data WHERE station_id = $1 AND fuel_type = $2",
        )
        .bind(station_id)
        .bind(fuel_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(verified_from_row).transpose()
    }

    async fn all_reports(&self) -> StoreResult<Vec<FuelReport>> {
        let rows = sqlx::query("SELECT * FROM crowdsourced_reports ORDER BY submitted_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(report_from_row).collect()
    }

    async fn all_trust_records(&self) -> StoreResult<Vec<TrustRecord>> {
        let rows = sqlx::query("SELECT * FROM user_trust_scores")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(trust_from_row).collect()
    }

    async fn all_verified(&self) -> StoreResult<Vec<VerifiedFuelRecord>> {
        let rows = sqlx::query("SELECT * FROM verified_fuel_data")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(verified_from_row).collect()
    }
}

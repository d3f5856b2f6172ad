//! Submission orchestration.
//!
//! `received → station resolved → trust resolved → scored →
//! accepted|rejected → persisted → auto-verified | consensus-checked`.
//!
//! Each submission runs to completion before returning; geocoding and
//! persistence are the only blocking points, and a failed geocode
//! degrades to a fallback instead of stalling the pipeline.

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use pumpwatch_common::{
    DveConfig, FuelReport, FuelType, GeoPoint, PumpWatchError, ScoreBreakdown, Station,
    TrustRecord, VerifiedFuelRecord,
};
use pumpwatch_store::RecordStore;

use crate::clock::Clock;
use crate::consensus::ConsensusAggregator;
use crate::geocode::Geocoder;
use crate::publisher::VerificationPublisher;
use crate::scoring::{proximity_factor, recency_factor, ScoringEngine};
use crate::trust::TrustLedger;

/// An incoming availability report, as submitted by a device.
#[derive(Debug, Clone)]
pub struct ReportSubmission {
    pub station_id: Uuid,
    pub fuel_type: FuelType,
    pub user_id: String,
    pub user_lat: f64,
    pub user_lon: f64,
    /// Coordinates were typed in, not taken from device geolocation.
    pub manual_location: bool,
}

/// Full score breakdown returned to the caller, accepted or not.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub report_id: Uuid,
    pub score: f64,
    pub trust: f64,
    pub recency_factor: f64,
    pub proximity_factor: f64,
    pub distance_km: f64,
    pub rejected: bool,
    pub rejection_reason: Option<String>,
    pub manual_location: bool,
    /// The single-report fast path fired, no consensus needed.
    pub auto_verified: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReprocessSummary {
    pub verified_count: usize,
}

/// Read-only view for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct AdminSnapshot {
    pub reports: Vec<FuelReport>,
    pub trust_scores: Vec<TrustRecord>,
    pub verified_records: Vec<VerifiedFuelRecord>,
    pub config: DveConfig,
}

pub struct ReportPipeline<S, G, C> {
    store: S,
    geocoder: G,
    clock: C,
    config: DveConfig,
    scoring: ScoringEngine,
    trust: TrustLedger<S>,
    consensus: ConsensusAggregator<S>,
    publisher: VerificationPublisher<S>,
}

impl<S, G, C> ReportPipeline<S, G, C>
where
    S: RecordStore + Clone,
    G: Geocoder,
    C: Clock,
{
    pub fn new(store: S, geocoder: G, clock: C, config: DveConfig) -> Self {
        Self {
            scoring: ScoringEngine::new(config.clone()),
            trust: TrustLedger::new(store.clone(), config.clone()),
            consensus: ConsensusAggregator::new(store.clone(), config.clone()),
            publisher: VerificationPublisher::new(store.clone()),
            store,
            geocoder,
            clock,
            config,
        }
    }

    /// The trust ledger, for external confirm/contradict processes.
    pub fn trust_ledger(&self) -> &TrustLedger<S> {
        &self.trust
    }

    /// Score, persist, and verify-or-aggregate one submission.
    ///
    /// The report is persisted before any verification step, so a
    /// persistence failure never leaves verified state referencing an
    /// unsaved report.
    pub async fn submit(
        &self,
        submission: ReportSubmission,
    ) -> Result<SubmissionOutcome, PumpWatchError> {
        validate(&submission)?;
        let now = self.clock.now();

        let station = self
            .store
            .station(submission.station_id)
            .await?
            .ok_or(PumpWatchError::StationNotFound(submission.station_id))?;

        let user_coords = GeoPoint {
            lat: submission.user_lat,
            lon: submission.user_lon,
        };
        let station_coords = self.station_coords_or_fallback(&station, user_coords).await?;

        let trust = self.trust.current(&submission.user_id, now).await?;
        let recency = recency_factor(now, now, &self.config);
        let proximity = proximity_factor(
            user_coords,
            station_coords,
            submission.manual_location,
            &self.config,
        );
        let outcome = self
            .scoring
            .score(trust.trust_score, recency, &proximity);
        let rejection_reason = outcome.rejection.map(|r| r.to_string());

        let report = FuelReport {
            id: Uuid::new_v4(),
            station_id: station.id,
            fuel_type: submission.fuel_type,
            user_id: submission.user_id.clone(),
            user_coords,
            manual_location: submission.manual_location,
            submitted_at: now,
            breakdown: ScoreBreakdown {
                trust: trust.trust_score,
                recency_factor: recency,
                proximity_factor: proximity.factor,
                score: outcome.score,
            },
            rejected: outcome.rejected(),
            rejection_reason: rejection_reason.clone(),
            verified: false,
        };
        self.store.insert_report(&report).await?;
        self.trust.note_submission(&submission.user_id, now).await?;

        let mut auto_verified = false;
        if outcome.rejected() {
            tracing::info!(
                report_id = %report.id,
                station_id = %station.id,
                fuel = %submission.fuel_type,
                reason = rejection_reason.as_deref().unwrap_or(""),
                "report rejected"
            );
        } else if outcome.score >= self.config.auto_verify_threshold {
            // Single-report fast path, bypasses consensus entirely.
            self.store.mark_report_verified(report.id).await?;
            self.publisher
                .publish(station.id, submission.fuel_type, outcome.score, 1, now)
                .await?;
            auto_verified = true;
            tracing::info!(
                report_id = %report.id,
                station_id = %station.id,
                fuel = %submission.fuel_type,
                score = outcome.score,
                "report auto-verified"
            );
        } else {
            self.consensus
                .run(station.id, submission.fuel_type, now)
                .await?;
        }

        Ok(SubmissionOutcome {
            report_id: report.id,
            score: outcome.score,
            trust: trust.trust_score,
            recency_factor: recency,
            proximity_factor: proximity.factor,
            distance_km: proximity.distance_km,
            rejected: outcome.rejected(),
            rejection_reason,
            manual_location: submission.manual_location,
            auto_verified,
        })
    }

    /// Catch-up pass over all pending reports.
    ///
    /// Re-applies the auto-verify check on each report's frozen score,
    /// then re-runs consensus per remaining (station, fuel) group.
    /// Never recomputes recency or proximity: those were frozen at
    /// submission. Running it twice with no new submissions in between
    /// verifies nothing the second time.
    pub async fn reprocess_pending(&self) -> Result<ReprocessSummary, PumpWatchError> {
        let now = self.clock.now();
        let pending = self.store.pending_reports().await?;
        let mut verified_count = 0usize;

        let mut consensus_groups: HashSet<(Uuid, FuelType)> = HashSet::new();
        for report in &pending {
            if report.breakdown.score >= self.config.auto_verify_threshold {
                self.store.mark_report_verified(report.id).await?;
                self.publisher
                    .publish(
                        report.station_id,
                        report.fuel_type,
                        report.breakdown.score,
                        1,
                        now,
                    )
                    .await?;
                verified_count += 1;
            } else {
                consensus_groups.insert((report.station_id, report.fuel_type));
            }
        }

        for (station_id, fuel_type) in consensus_groups {
            if let Some(promotion) = self.consensus.run(station_id, fuel_type, now).await? {
                verified_count += promotion.reports_promoted;
            }
        }

        tracing::info!(verified_count, "reprocessing complete");
        Ok(ReprocessSummary { verified_count })
    }

    /// Pure read for the admin dashboard. No mutation.
    pub async fn admin_snapshot(&self) -> Result<AdminSnapshot, PumpWatchError> {
        Ok(AdminSnapshot {
            reports: self.store.all_reports().await?,
            trust_scores: self.store.all_trust_records().await?,
            verified_records: self.store.all_verified().await?,
            config: self.config.clone(),
        })
    }

    /// Resolve the station's coordinates, geocoding and backfilling
    /// when absent.
    ///
    /// On geocoding failure the *reporter's* coordinates stand in for
    /// the station. A known approximation that biases proximity toward
    /// acceptance; kept as deployed behavior, isolated here so it can
    /// be revisited.
    async fn station_coords_or_fallback(
        &self,
        station: &Station,
        user_coords: GeoPoint,
    ) -> Result<GeoPoint, PumpWatchError> {
        if let Some(coords) = station.coords {
            return Ok(coords);
        }

        match self.geocoder.resolve(&station.address).await {
            Ok(Some(coords)) => {
                self.store.set_station_coords(station.id, coords).await?;
                tracing::info!(
                    station_id = %station.id,
                    lat = coords.lat,
                    lon = coords.lon,
                    "backfilled station coordinates from geocoder"
                );
                Ok(coords)
            }
            Ok(None) => {
                tracing::warn!(
                    station_id = %station.id,
                    address = station.address.as_str(),
                    "no geocoding match, using reporter location as station stand-in"
                );
                Ok(user_coords)
            }
            Err(e) => {
                tracing::warn!(
                    station_id = %station.id,
                    error = %e,
                    "geocoding unavailable, using reporter location as station stand-in"
                );
                Ok(user_coords)
            }
        }
    }
}

fn validate(submission: &ReportSubmission) -> Result<(), PumpWatchError> {
    if submission.user_id.trim().is_empty() {
        return Err(PumpWatchError::Validation(
            "user id is required".to_string(),
        ));
    }
    if !submission.user_lat.is_finite() || !submission.user_lon.is_finite() {
        return Err(PumpWatchError::Validation(
            "coordinates must be finite numbers".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> ReportSubmission {
        ReportSubmission {
            station_id: Uuid::new_v4(),
            fuel_type: FuelType::Diesel,
            user_id: "device-1".to_string(),
            user_lat: 6.9,
            user_lon: 79.8,
            manual_location: false,
        }
    }

    #[test]
    fn blank_user_id_fails_validation() {
        let sub = ReportSubmission {
            user_id: "  ".to_string(),
            ..submission()
        };
        assert!(matches!(
            validate(&sub),
            Err(PumpWatchError::Validation(_))
        ));
    }

    #[test]
    fn non_finite_coordinates_fail_validation() {
        let sub = ReportSubmission {
            user_lat: f64::NAN,
            ..submission()
        };
        assert!(validate(&sub).is_err());

        let sub = ReportSubmission {
            user_lon: f64::INFINITY,
            ..submission()
        };
        assert!(validate(&sub).is_err());
    }

    #[test]
    fn well_formed_submission_passes_validation() {
        assert!(validate(&submission()).is_ok());
    }
}

//! Multi-report consensus.
//!
//! Groups of accepted-but-unverified reports for one (station, fuel)
//! pair are promoted together once their aggregate confidence clears
//! the bar. Groups that don't clear it stay pending; no negative
//! action is taken, they remain eligible on the next pass.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use pumpwatch_common::{DveConfig, FuelReport, FuelType, PumpWatchError};
use pumpwatch_store::RecordStore;

use crate::publisher::VerificationPublisher;

/// Aggregate stats and decision for one report group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupVerdict {
    pub average_score: f64,
    /// average + consensus bonus, capped at 1.0.
    pub promoted_score: f64,
    /// Distinct user ids, not report count.
    pub unique_reporters: u32,
    pub promote: bool,
}

/// Pure promotion decision over a group's frozen per-report scores.
pub fn evaluate(reports: &[FuelReport], config: &DveConfig) -> Option<GroupVerdict> {
    if reports.is_empty() {
        return None;
    }

    let unique_reporters = reports
        .iter()
        .map(|r| r.user_id.as_str())
        .collect::<HashSet<_>>()
        .len() as u32;
    let average_score =
        reports.iter().map(|r| r.breakdown.score).sum::<f64>() / reports.len() as f64;
    let promoted_score = (average_score + config.consensus_bonus).min(1.0);
    let promote = reports.len() >= config.min_reports_for_consensus
        && promoted_score >= config.verification_threshold;

    Some(GroupVerdict {
        average_score,
        promoted_score,
        unique_reporters,
        promote,
    })
}

/// Result of an applied promotion.
#[derive(Debug, Clone, Copy)]
pub struct Promotion {
    pub confidence: f64,
    pub verified_by_count: u32,
    pub reports_promoted: usize,
}

pub struct ConsensusAggregator<S> {
    store: S,
    publisher: VerificationPublisher<S>,
    config: DveConfig,
}

impl<S: RecordStore + Clone> ConsensusAggregator<S> {
    pub fn new(store: S, config: DveConfig) -> Self {
        Self {
            publisher: VerificationPublisher::new(store.clone()),
            store,
            config,
        }
    }

    /// Evaluate the pending group for one (station, fuel) pair and
    /// promote it if it clears the bar.
    ///
    /// Idempotent: only not-yet-verified reports are read, so re-running
    /// against an already-promoted group finds nothing to do.
    pub async fn run(
        &self,
        station_id: Uuid,
        fuel_type: FuelType,
        now: DateTime<Utc>,
    ) -> Result<Option<Promotion>, PumpWatchError> {
        let since = now - Duration::seconds((self.config.max_age_hours * 3600.0) as i64);
        let reports = self
            .store
            .accepted_unverified_reports(station_id, fuel_type, since)
            .await?;

        let Some(verdict) = evaluate(&reports, &self.config) else {
            return Ok(None);
        };
        if !verdict.promote {
            tracing::debug!(
                %station_id,
                fuel = %fuel_type,
                promoted_score = verdict.promoted_score,
                reports = reports.len(),
                "consensus group below threshold, staying pending"
            );
            return Ok(None);
        }

        for report in &reports {
            self.store.mark_report_verified(report.id).await?;
        }
        self.publisher
            .publish(
                station_id,
                fuel_type,
                verdict.promoted_score,
                verdict.unique_reporters,
                now,
            )
            .await?;

        tracing::info!(
            %station_id,
            fuel = %fuel_type,
            confidence = verdict.promoted_score,
            reporters = verdict.unique_reporters,
            reports = reports.len(),
            "consensus promotion"
        );

        Ok(Some(Promotion {
            confidence: verdict.promoted_score,
            verified_by_count: verdict.unique_reporters,
            reports_promoted: reports.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pumpwatch_common::{GeoPoint, ScoreBreakdown};

    fn report(user_id: &str, score: f64) -> FuelReport {
        FuelReport {
            id: Uuid::new_v4(),
            station_id: Uuid::new_v4(),
            fuel_type: FuelType::Diesel,
            user_id: user_id.to_string(),
            user_coords: GeoPoint { lat: 0.0, lon: 0.0 },
            manual_location: false,
            submitted_at: Utc::now(),
            breakdown: ScoreBreakdown {
                trust: 0.5,
                recency_factor: 1.0,
                proximity_factor: 1.0,
                score,
            },
            rejected: false,
            rejection_reason: None,
            verified: false,
        }
    }

    #[test]
    fn empty_group_has_no_verdict() {
        assert!(evaluate(&[], &DveConfig::default()).is_none());
    }

    #[test]
    fn single_report_clearing_threshold_promotes() {
        // min_reports_for_consensus is 1: avg 0.3 + bonus 0.2 = 0.5 ≥ 0.4.
        let verdict = evaluate(&[report("u1", 0.3)], &DveConfig::default()).unwrap();
        assert!(verdict.promote);
        assert!((verdict.promoted_score - 0.5).abs() < 1e-9);
        assert_eq!(verdict.unique_reporters, 1);
    }

    #[test]
    fn group_below_threshold_stays_pending() {
        // avg 0.15 + 0.2 = 0.35 < 0.4.
        let reports = [report("u1", 0.1), report("u2", 0.2)];
        let verdict = evaluate(&reports, &DveConfig::default()).unwrap();
        assert!(!verdict.promote);
    }

    #[test]
    fn promoted_score_caps_at_one() {
        let verdict = evaluate(&[report("u1", 0.95)], &DveConfig::default()).unwrap();
        assert_eq!(verdict.promoted_score, 1.0);
    }

    #[test]
    fn unique_reporters_counts_users_not_reports() {
        let reports = [
            report("u1", 0.4),
            report("u1", 0.45),
            report("u2", 0.5),
        ];
        let verdict = evaluate(&reports, &DveConfig::default()).unwrap();
        assert_eq!(verdict.unique_reporters, 2);
        assert!(verdict.promote);
    }

    #[test]
    fn larger_minimum_group_size_is_honored() {
        let config = DveConfig {
            min_reports_for_consensus: 3,
            ..DveConfig::default()
        };
        let reports = [report("u1", 0.45), report("u2", 0.45)];
        let verdict = evaluate(&reports, &config).unwrap();
        assert!(!verdict.promote);
    }
}

//! Per-report scoring: recency decay, proximity weighting, and the
//! combined accept/reject decision.

use chrono::{DateTime, Utc};

use pumpwatch_common::{haversine_km, DveConfig, GeoPoint};

/// Exponential decay weight for a report's age.
///
/// 1.0 at age zero, halving every `recency_half_life_hours`, and a hard
/// 0 for anything older than `max_age_hours` (a hard cutoff, not just
/// asymptotic decay).
pub fn recency_factor(
    submitted_at: DateTime<Utc>,
    now: DateTime<Utc>,
    config: &DveConfig,
) -> f64 {
    let age_hours = (now - submitted_at).num_milliseconds() as f64 / 3_600_000.0;
    if age_hours > config.max_age_hours {
        return 0.0;
    }
    0.5_f64.powf(age_hours / config.recency_half_life_hours)
}

/// Outcome of the proximity check.
///
/// `valid == false` is a hard rejection trigger, distinct from a
/// low-but-valid factor. Distance is always computed for diagnostics,
/// including on the manual-location path.
#[derive(Debug, Clone, Copy)]
pub struct ProximityResult {
    pub factor: f64,
    pub distance_km: f64,
    pub valid: bool,
    pub manual: bool,
}

/// Weight for how close the reporter was to the station.
///
/// Manual area entry gets a fixed penalty factor instead of a distance
/// check: unverifiable locations are discouraged, not discarded.
pub fn proximity_factor(
    user: GeoPoint,
    station: GeoPoint,
    manual: bool,
    config: &DveConfig,
) -> ProximityResult {
    let distance_km = haversine_km(user.lat, user.lon, station.lat, station.lon);

    if manual {
        return ProximityResult {
            factor: config.manual_penalty,
            distance_km,
            valid: true,
            manual: true,
        };
    }

    if distance_km > config.max_distance_km {
        return ProximityResult {
            factor: 0.0,
            distance_km,
            valid: false,
            manual: false,
        };
    }
    if distance_km <= config.optimal_distance_km {
        return ProximityResult {
            factor: 1.0,
            distance_km,
            valid: true,
            manual: false,
        };
    }
    let factor = 1.0
        - (distance_km - config.optimal_distance_km)
            / (config.max_distance_km - config.optimal_distance_km);
    ProximityResult {
        factor: factor.max(0.0),
        distance_km,
        valid: true,
        manual: false,
    }
}

/// Why a report was rejected. Rendered for the submitter with the
/// numeric basis included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    TooFar { distance_km: f64 },
    BelowThreshold { score: f64, threshold: f64 },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::TooFar { distance_km } => {
                write!(f, "User too far from station ({distance_km:.2}km)")
            }
            Rejection::BelowThreshold { score, threshold } => write!(
                f,
                "DVE score too low ({:.1}% < {:.0}% threshold). Try reporting from closer to the station.",
                score * 100.0,
                threshold * 100.0
            ),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScoreOutcome {
    pub score: f64,
    pub rejection: Option<Rejection>,
}

impl ScoreOutcome {
    pub fn rejected(&self) -> bool {
        self.rejection.is_some()
    }
}

/// Combines trust, recency, and proximity into the DVE score and
/// applies the accept/reject policy. Pure: trust is resolved by the
/// pipeline, not fetched here.
pub struct ScoringEngine {
    config: DveConfig,
}

impl ScoringEngine {
    pub fn new(config: DveConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, trust: f64, recency: f64, proximity: &ProximityResult) -> ScoreOutcome {
        if !proximity.valid {
            return ScoreOutcome {
                score: 0.0,
                rejection: Some(Rejection::TooFar {
                    distance_km: proximity.distance_km,
                }),
            };
        }

        let raw = trust * recency * proximity.factor * self.config.score_amplifier;
        let score = raw.min(1.0);

        if score < self.config.verification_threshold {
            return ScoreOutcome {
                score,
                rejection: Some(Rejection::BelowThreshold {
                    score,
                    threshold: self.config.verification_threshold,
                }),
            };
        }

        ScoreOutcome {
            score,
            rejection: None,
        }
    }
}

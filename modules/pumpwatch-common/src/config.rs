use std::env;

use serde::{Deserialize, Serialize};

/// Tunables for the Data Verification Engine.
///
/// An immutable value threaded into the engine constructors, so tests
/// can override individual knobs without touching ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DveConfig {
    /// Trust score assigned to a user on their first report.
    pub initial_trust: f64,
    /// Applied by `TrustLedger::adjust` on a confirmed report.
    pub trust_increment: f64,
    /// Applied by `TrustLedger::adjust` on a contradicted report.
    pub trust_decrement: f64,
    pub min_trust: f64,
    pub max_trust: f64,
    /// Recency decay half-life, hours.
    pub recency_half_life_hours: f64,
    /// Reports older than this are worth nothing and excluded from consensus.
    pub max_age_hours: f64,
    /// Beyond this distance a report is rejected outright.
    pub max_distance_km: f64,
    /// Within this distance proximity is a full 1.0.
    pub optimal_distance_km: f64,
    pub min_reports_for_consensus: usize,
    pub consensus_threshold: f64,
    /// Added to a group's average score before the promotion check.
    pub consensus_bonus: f64,
    /// Reports scoring below this are rejected; promotions must clear it.
    pub verification_threshold: f64,
    /// A single report at or above this score verifies without consensus.
    pub auto_verify_threshold: f64,
    /// Fixed proximity factor for manually entered locations.
    pub manual_penalty: f64,
    /// Calibration constant scaling trust × recency × proximity back into
    /// a usable range. Not part of the scoring model proper; keep it
    /// named, never inlined.
    pub score_amplifier: f64,
}

impl Default for DveConfig {
    fn default() -> Self {
        Self {
            initial_trust: 0.5,
            trust_increment: 0.05,
            trust_decrement: 0.1,
            min_trust: 0.1,
            max_trust: 1.0,
            recency_half_life_hours: 24.0,
            max_age_hours: 168.0,
            max_distance_km: 2.0,
            optimal_distance_km: 0.5,
            min_reports_for_consensus: 1,
            consensus_threshold: 0.6,
            consensus_bonus: 0.2,
            verification_threshold: 0.4,
            auto_verify_threshold: 0.5,
            manual_penalty: 0.1,
            score_amplifier: 10.0,
        }
    }
}

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Nominatim-compatible geocoding endpoint.
    pub geocoder_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            geocoder_url: env::var("GEOCODER_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org/search".to_string()),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

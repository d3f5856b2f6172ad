use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Geo Types ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

// --- Fuel Types ---

/// The fuel products users can report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    E10,
    E20,
    PurePetrol,
    Diesel,
    Cng,
}

impl FuelType {
    pub const ALL: [FuelType; 5] = [
        FuelType::E10,
        FuelType::E20,
        FuelType::PurePetrol,
        FuelType::Diesel,
        FuelType::Cng,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::E10 => "e10",
            FuelType::E20 => "e20",
            FuelType::PurePetrol => "pure_petrol",
            FuelType::Diesel => "diesel",
            FuelType::Cng => "cng",
        }
    }
}

impl std::fmt::Display for FuelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FuelType {
    type Err = crate::error::PumpWatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "e10" => Ok(FuelType::E10),
            "e20" => Ok(FuelType::E20),
            "pure_petrol" => Ok(FuelType::PurePetrol),
            "diesel" => Ok(FuelType::Diesel),
            "cng" => Ok(FuelType::Cng),
            other => Err(crate::error::PumpWatchError::Validation(format!(
                "unknown fuel type '{other}'"
            ))),
        }
    }
}

// --- Station ---

/// A fuel station. Owned by the station registry; the verification core
/// only reads it, except for backfilling coordinates after geocoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    /// Absent until geocoded.
    pub coords: Option<GeoPoint>,
    /// Cross-reference into the seed pump dataset.
    pub legacy_id: Option<i64>,
}

// --- Reports ---

/// The three sub-unity factors and their product, frozen at submission.
///
/// Captured from the trust score in effect at that moment; never
/// recomputed, even if the user's trust changes later.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub trust: f64,
    pub recency_factor: f64,
    pub proximity_factor: f64,
    pub score: f64,
}

/// A crowdsourced fuel availability report.
///
/// Immutable once scored, except for `verified`, which the consensus
/// aggregator (or the auto-verify fast path) flips later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuelReport {
    pub id: Uuid,
    pub station_id: Uuid,
    pub fuel_type: FuelType,
    /// Anonymous per-device identifier, not an account.
    pub user_id: String,
    pub user_coords: GeoPoint,
    /// Coordinates came from manual area entry instead of device geolocation.
    pub manual_location: bool,
    pub submitted_at: DateTime<Utc>,
    pub breakdown: ScoreBreakdown,
    pub rejected: bool,
    pub rejection_reason: Option<String>,
    pub verified: bool,
}

impl FuelReport {
    /// Accepted but not yet promoted to verified.
    pub fn is_pending(&self) -> bool {
        !self.rejected && !self.verified
    }
}

// --- Trust ---

/// Per-user reliability ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustRecord {
    pub user_id: String,
    /// Reliability weight in [MIN_TRUST, MAX_TRUST].
    pub trust_score: f64,
    pub total_reports: u32,
    pub correct_reports: u32,
    pub incorrect_reports: u32,
    pub updated_at: DateTime<Utc>,
}

// --- Verified availability ---

/// The externally visible availability record, keyed (station, fuel).
///
/// Upserted on every promotion, last-write-wins. Never deleted:
/// availability state only moves forward in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedFuelRecord {
    pub station_id: Uuid,
    pub fuel_type: FuelType,
    pub available: bool,
    pub confidence: f64,
    /// Distinct users behind the promotion, not report count.
    pub verified_by_count: u32,
    pub last_verified_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuel_type_round_trips_through_str() {
        for fuel in FuelType::ALL {
            let parsed: FuelType = fuel.as_str().parse().unwrap();
            assert_eq!(parsed, fuel);
        }
    }

    #[test]
    fn unknown_fuel_type_is_a_validation_error() {
        assert!("petrol_200".parse::<FuelType>().is_err());
    }
}

//! The Data Verification Engine.
//!
//! Scores crowdsourced fuel reports (trust × recency × proximity),
//! auto-verifies high scorers, promotes groups of lower scorers by
//! consensus, and publishes the verified availability record per
//! (station, fuel) pair.

pub mod clock;
pub mod consensus;
pub mod geocode;
pub mod pipeline;
pub mod publisher;
pub mod scoring;
pub mod trust;

pub use clock::{Clock, SystemClock};
pub use consensus::{ConsensusAggregator, GroupVerdict, Promotion};
pub use geocode::{Geocoder, NominatimGeocoder};
pub use pipeline::{
    AdminSnapshot, ReportPipeline, ReportSubmission, ReprocessSummary, SubmissionOutcome,
};
pub use publisher::VerificationPublisher;
pub use scoring::{
    proximity_factor, recency_factor, ProximityResult, Rejection, ScoreOutcome, ScoringEngine,
};
pub use trust::{TrustLedger, TrustSignal};

//! Per-user trust ledger.
//!
//! The pipeline only *reads* trust at scoring time. `adjust` is the
//! pluggable contract for whatever external process later confirms or
//! contradicts a report; nothing in the engine decides that.

use chrono::{DateTime, Utc};

use pumpwatch_common::{DveConfig, PumpWatchError, TrustRecord};
use pumpwatch_store::RecordStore;

/// Later evidence about a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustSignal {
    Confirmed,
    Contradicted,
}

pub struct TrustLedger<S> {
    store: S,
    config: DveConfig,
}

impl<S: RecordStore> TrustLedger<S> {
    pub fn new(store: S, config: DveConfig) -> Self {
        Self { store, config }
    }

    /// Current trust record, lazily created at the initial score on a
    /// user's first report.
    pub async fn current(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<TrustRecord, PumpWatchError> {
        if let Some(record) = self.store.trust_record(user_id).await? {
            return Ok(record);
        }
        let record = TrustRecord {
            user_id: user_id.to_string(),
            trust_score: self.config.initial_trust,
            total_reports: 0,
            correct_reports: 0,
            incorrect_reports: 0,
            updated_at: now,
        };
        self.store.insert_trust_record(&record).await?;
        tracing::debug!(user_id, trust = record.trust_score, "created trust record");
        Ok(record)
    }

    /// Bump the submission counter. Does not touch the score.
    pub async fn note_submission(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PumpWatchError> {
        let mut record = self.current(user_id, now).await?;
        record.total_reports += 1;
        record.updated_at = now;
        self.store.update_trust_record(&record).await
    }

    /// Apply confirm/contradict evidence: increment or decrement the
    /// score, clamped to [min_trust, max_trust], and keep the counters.
    pub async fn adjust(
        &self,
        user_id: &str,
        signal: TrustSignal,
        now: DateTime<Utc>,
    ) -> Result<TrustRecord, PumpWatchError> {
        let mut record = self.current(user_id, now).await?;
        match signal {
            TrustSignal::Confirmed => {
                record.trust_score += self.config.trust_increment;
                record.correct_reports += 1;
            }
            TrustSignal::Contradicted => {
                record.trust_score -= self.config.trust_decrement;
                record.incorrect_reports += 1;
            }
        }
        record.trust_score = record
            .trust_score
            .clamp(self.config.min_trust, self.config.max_trust);
        record.updated_at = now;
        self.store.update_trust_record(&record).await?;
        tracing::info!(
            user_id,
            trust = record.trust_score,
            ?signal,
            "trust score adjusted"
        );
        Ok(record)
    }
}

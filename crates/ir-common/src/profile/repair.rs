use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::model::{CandidatePatch, CandidateRecord, Identity};
use crate::store::{CandidateStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// Nothing was resolved, so there is nothing to repair.
    NoCanonical,
    /// The link key already matches the identity.
    InSync,
    /// The link key was rewritten in the store.
    Repaired,
    /// The rewrite failed; the returned record still carries the corrected key.
    WriteFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepairResult {
    pub record: Option<CandidateRecord>,
    pub outcome: RepairOutcome,
}

/// True when the record's link key does not point at `identity`.
pub fn needs_repair(identity: &Identity, canonical: &CandidateRecord) -> bool {
    canonical.link_key.as_deref().map(str::trim) != Some(identity.id.trim())
}

/// Self-healing rewrite of a canonical record's link key.
///
/// The patch only carries values derived from the identity, so concurrent or
/// repeated repairs converge on the same stored state.
pub struct DriftRepair {
    candidates: Arc<dyn CandidateStore>,
}

impl DriftRepair {
    pub fn new(candidates: Arc<dyn CandidateStore>) -> Self {
        Self { candidates }
    }

    #[instrument(skip_all, fields(identity_id = %identity.id))]
    pub async fn repair(
        &self,
        identity: &Identity,
        canonical: Option<CandidateRecord>,
    ) -> RepairResult {
        let Some(mut record) = canonical else {
            return RepairResult {
                record: None,
                outcome: RepairOutcome::NoCanonical,
            };
        };

        if !needs_repair(identity, &record) {
            return RepairResult {
                record: Some(record),
                outcome: RepairOutcome::InSync,
            };
        }

        let patch = CandidatePatch {
            link_key: identity.id.trim().to_string(),
            updated_at: Utc::now(),
        };
        let previous = record.link_key.take();
        record.link_key = Some(patch.link_key.clone());
        record.updated_at = Some(patch.updated_at);

        let outcome = match self.write(record.id.clone(), patch).await {
            Ok(()) => {
                info!(
                    candidate_id = %record.id,
                    previous_link_key = previous.as_deref().unwrap_or(""),
                    "candidate_link_key_repaired"
                );
                RepairOutcome::Repaired
            }
            Err(err) => {
                warn!(candidate_id = %record.id, error = %err, "candidate_link_key_repair_failed");
                RepairOutcome::WriteFailed
            }
        };

        RepairResult {
            record: Some(record),
            outcome,
        }
    }

    /// The update runs on its own task: cancelling the caller must not abort a
    /// write that is already in flight.
    async fn write(&self, candidate_id: String, patch: CandidatePatch) -> Result<(), StoreError> {
        let store = Arc::clone(&self.candidates);
        let handle = tokio::spawn(async move { store.update(&candidate_id, &patch).await });

        match handle.await {
            Ok(result) => result,
            Err(join_err) => Err(StoreError::Query(format!("repair task aborted: {join_err}"))),
        }
    }
}

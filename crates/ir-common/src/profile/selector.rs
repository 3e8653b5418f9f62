use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use super::status_rank::status_rank;
use crate::model::CandidateRecord;

/// Pick the canonical record out of every record resolved for one identity.
///
/// Order: ready records first, then higher status rank, then the most recent
/// `updated_at` (falling back to `created_at`; missing counts as epoch 0).
/// The sort is stable, so records with equal keys keep their input order.
pub fn select_canonical(candidates: &[CandidateRecord]) -> Option<CandidateRecord> {
    match candidates {
        [] => None,
        [only] => Some(only.clone()),
        _ => {
            let mut ranked: Vec<&CandidateRecord> = candidates.iter().collect();
            ranked.sort_by(|a, b| compare_candidates(a, b));
            ranked.first().map(|best| (*best).clone())
        }
    }
}

/// `Less` means `a` is preferred over `b`.
pub fn compare_candidates(a: &CandidateRecord, b: &CandidateRecord) -> Ordering {
    b.readiness_flag
        .cmp(&a.readiness_flag)
        .then_with(|| status_rank(&b.status).cmp(&status_rank(&a.status)))
        .then_with(|| recency_key(b).cmp(&recency_key(a)))
}

fn recency_key(candidate: &CandidateRecord) -> DateTime<Utc> {
    candidate.recency().unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

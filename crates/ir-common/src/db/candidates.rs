use deadpool_postgres::PoolError;
use tokio_postgres::Error as PgError;
use tokio_postgres::Row;
use tracing::instrument;

use crate::db::util::TimedClientExt;
use crate::db::{PgPool, classify_pg_error, pool_fault};
use crate::model::{CandidatePatch, CandidateRecord, ProfileStatus};
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CandidateStorageError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to map candidate row: {0}")]
    Mapping(String),
    #[error("candidate not found: {0}")]
    NotFound(String),
}

impl From<CandidateStorageError> for StoreError {
    fn from(value: CandidateStorageError) -> Self {
        match value {
            CandidateStorageError::Pool(err) => pool_fault(&err),
            CandidateStorageError::Postgres(err) => classify_pg_error(&err),
            CandidateStorageError::Mapping(msg) => StoreError::Mapping(msg),
            CandidateStorageError::NotFound(id) => StoreError::NotFound(id),
        }
    }
}

const CANDIDATE_COLUMNS: &str = "id, user_id, headline, bio, experience, portfolio_url, \
     intro_video_url, status, submitted_at, revision_notes, profile_completion, hourly_rate, \
     availability, hours_per_week, is_ready, avatar_url, created_at, updated_at";

fn map_candidate_row(row: &Row) -> Result<CandidateRecord, tokio_postgres::Error> {
    let status: Option<String> = row.try_get("status")?;

    Ok(CandidateRecord {
        id: row.try_get("id")?,
        link_key: row.try_get("user_id")?,
        headline: row.try_get("headline")?,
        bio: row.try_get("bio")?,
        experience: row.try_get("experience")?,
        portfolio_url: row.try_get("portfolio_url")?,
        intro_video_url: row.try_get("intro_video_url")?,
        status: status.as_deref().map(ProfileStatus::parse).unwrap_or_default(),
        submitted_at: row.try_get("submitted_at")?,
        revision_notes: row.try_get("revision_notes")?,
        completion_stored: row
            .try_get::<_, Option<f64>>("profile_completion")?
            .filter(|value| value.is_finite()),
        hourly_rate: row.try_get("hourly_rate")?,
        availability: row.try_get("availability")?,
        hours_per_week: row.try_get("hours_per_week")?,
        readiness_flag: row.try_get::<_, Option<bool>>("is_ready")?.unwrap_or(false),
        avatar_url: row.try_get("avatar_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_candidate_rows(rows: &[Row]) -> Result<Vec<CandidateRecord>, CandidateStorageError> {
    rows.iter()
        .map(map_candidate_row)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| CandidateStorageError::Mapping(err.to_string()))
}

#[instrument(skip(pool))]
pub async fn fetch_candidates_by_link_key(
    pool: &PgPool,
    link_key: &str,
) -> Result<Vec<CandidateRecord>, CandidateStorageError> {
    let client = pool.get().await?;
    let sql = format!(
        "SELECT {CANDIDATE_COLUMNS} FROM profile.candidate_profiles WHERE user_id = $1 ORDER BY id"
    );

    let rows = client
        .timed_query_cached(&sql, &[&link_key], "fetch_candidates_by_link_key")
        .await?;
    map_candidate_rows(&rows)
}

#[instrument(skip(pool))]
pub async fn fetch_candidates_by_id(
    pool: &PgPool,
    candidate_id: &str,
) -> Result<Vec<CandidateRecord>, CandidateStorageError> {
    let client = pool.get().await?;
    let sql = format!("SELECT {CANDIDATE_COLUMNS} FROM profile.candidate_profiles WHERE id = $1");

    let rows = client
        .timed_query_cached(&sql, &[&candidate_id], "fetch_candidates_by_id")
        .await?;
    map_candidate_rows(&rows)
}

/// Most recently touched candidates first, capped at `limit` rows.
#[instrument(skip(pool))]
pub async fn list_candidates(
    pool: &PgPool,
    limit: usize,
) -> Result<Vec<CandidateRecord>, CandidateStorageError> {
    let client = pool.get().await?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let sql = format!(
        "SELECT {CANDIDATE_COLUMNS} FROM profile.candidate_profiles \
         ORDER BY updated_at DESC NULLS LAST, id \
         LIMIT $1"
    );

    let rows = client
        .timed_query_cached(&sql, &[&limit], "list_candidates")
        .await?;
    map_candidate_rows(&rows)
}

/// Point a candidate at its identity. Writing the same patch twice leaves the
/// row in the same state.
#[instrument(skip(pool, patch))]
pub async fn update_candidate_link_key(
    pool: &PgPool,
    candidate_id: &str,
    patch: &CandidatePatch,
) -> Result<(), CandidateStorageError> {
    let client = pool.get().await?;

    let updated = client
        .timed_execute_cached(
            "UPDATE profile.candidate_profiles
             SET user_id = $2, updated_at = $3
             WHERE id = $1",
            &[&candidate_id, &patch.link_key, &patch.updated_at],
            "update_candidate_link_key",
        )
        .await?;

    if updated == 0 {
        return Err(CandidateStorageError::NotFound(candidate_id.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_keep_their_store_meaning() {
        assert!(matches!(
            StoreError::from(CandidateStorageError::NotFound("c1".into())),
            StoreError::NotFound(id) if id == "c1"
        ));
        assert!(matches!(
            StoreError::from(CandidateStorageError::Mapping("bad status".into())),
            StoreError::Mapping(_)
        ));
        assert!(StoreError::from(CandidateStorageError::Pool(PoolError::Closed)).is_transport());
    }
}

use deadpool_postgres::PoolError;
use tokio_postgres::Error as PgError;
use tokio_postgres::Row;
use tracing::instrument;

use crate::db::util::TimedClientExt;
use crate::db::{PgPool, classify_pg_error, pool_fault};
use crate::model::PrimaryRecord;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum PrimaryFetchError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to map user row: {0}")]
    Mapping(String),
}

impl From<PrimaryFetchError> for StoreError {
    fn from(value: PrimaryFetchError) -> Self {
        match value {
            PrimaryFetchError::Pool(err) => pool_fault(&err),
            PrimaryFetchError::Postgres(err) => classify_pg_error(&err),
            PrimaryFetchError::Mapping(msg) => StoreError::Mapping(msg),
        }
    }
}

fn map_primary_row(row: &Row) -> Result<PrimaryRecord, tokio_postgres::Error> {
    Ok(PrimaryRecord {
        full_name: row.try_get("full_name")?,
        country: row.try_get("country")?,
        timezone: row.try_get("timezone")?,
        bio: row.try_get("bio")?,
        phone: row.try_get("phone")?,
        location: row.try_get("location")?,
        linked_in_url: row.try_get("linkedin_url")?,
        github_url: row.try_get("github_url")?,
        avatar_url: row.try_get("avatar_url")?,
        created_at: row.try_get("created_at")?,
        revision_notes: row.try_get("revision_notes")?,
    })
}

/// Demographic record for one identity, `None` when the user row is missing.
#[instrument(skip(pool))]
pub async fn fetch_primary_record(
    pool: &PgPool,
    user_id: &str,
) -> Result<Option<PrimaryRecord>, PrimaryFetchError> {
    let client = pool.get().await?;

    let row = client
        .timed_query_opt_cached(
            "SELECT full_name, country, timezone, bio, phone, location, linkedin_url,
                    github_url, avatar_url, created_at, revision_notes
             FROM profile.users
             WHERE id = $1",
            &[&user_id],
            "fetch_primary_record",
        )
        .await?;

    row.as_ref()
        .map(map_primary_row)
        .transpose()
        .map_err(|err| PrimaryFetchError::Mapping(err.to_string()))
}

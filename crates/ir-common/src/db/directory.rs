use deadpool_postgres::PoolError;
use tokio_postgres::Error as PgError;
use tracing::instrument;

use crate::db::util::TimedClientExt;
use crate::db::{PgPool, classify_pg_error, pool_fault};
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryFetchError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to map identity directory row: {0}")]
    Mapping(String),
}

impl From<DirectoryFetchError> for StoreError {
    fn from(value: DirectoryFetchError) -> Self {
        match value {
            DirectoryFetchError::Pool(err) => pool_fault(&err),
            DirectoryFetchError::Postgres(err) => classify_pg_error(&err),
            DirectoryFetchError::Mapping(msg) => StoreError::Mapping(msg),
        }
    }
}

/// Authoritative id registered for `email`, compared case-insensitively.
#[instrument(skip(pool, email))]
pub async fn find_identity_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<String>, DirectoryFetchError> {
    let client = pool.get().await?;
    let email = email.trim();

    let row = client
        .timed_query_opt_cached(
            "SELECT id
             FROM profile.identity_directory
             WHERE lower(email) = lower($1)
             ORDER BY id
             LIMIT 1",
            &[&email],
            "find_identity_by_email",
        )
        .await?;

    row.map(|row| row.try_get::<_, String>("id"))
        .transpose()
        .map_err(|err| DirectoryFetchError::Mapping(err.to_string()))
}

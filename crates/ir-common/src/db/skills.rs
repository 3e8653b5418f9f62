use deadpool_postgres::PoolError;
use tokio_postgres::Error as PgError;
use tracing::instrument;

use crate::db::util::TimedClientExt;
use crate::db::{PgPool, classify_pg_error, pool_fault};
use crate::model::SkillRef;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SkillFetchError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to map skill row: {0}")]
    Mapping(String),
}

impl From<SkillFetchError> for StoreError {
    fn from(value: SkillFetchError) -> Self {
        match value {
            SkillFetchError::Pool(err) => pool_fault(&err),
            SkillFetchError::Postgres(err) => classify_pg_error(&err),
            SkillFetchError::Mapping(msg) => StoreError::Mapping(msg),
        }
    }
}

#[instrument(skip(pool))]
pub async fn fetch_skills_for_candidate(
    pool: &PgPool,
    candidate_id: &str,
) -> Result<Vec<SkillRef>, SkillFetchError> {
    let client = pool.get().await?;

    let rows = client
        .timed_query_cached(
            "SELECT s.id, s.name
             FROM profile.candidate_skills cs
             JOIN profile.skills s ON s.id = cs.skill_id
             WHERE cs.candidate_id = $1
             ORDER BY s.name, s.id",
            &[&candidate_id],
            "fetch_skills_for_candidate",
        )
        .await?;

    rows.iter()
        .map(|row| {
            Ok(SkillRef {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
            })
        })
        .collect::<Result<Vec<_>, tokio_postgres::Error>>()
        .map_err(|err| SkillFetchError::Mapping(err.to_string()))
}

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::db::{
    MigrationError, PgPool, applied_schema_version, classify_pg_error, pool_fault, fetch_candidates_by_id, fetch_candidates_by_link_key,
    fetch_primary_record, fetch_skills_for_candidate, find_identity_by_email, list_candidates,
    update_candidate_link_key,
};
use crate::model::{CandidatePatch, CandidateRecord, PrimaryRecord, SkillRef};
use crate::store::{CandidateStore, IdentityDirectory, PrimaryStore, SkillStore, StoreError};

pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 2_000;

/// PostgreSQL-backed implementation of every profile collaborator.
///
/// Each call is bounded by `query_timeout`; an elapsed call surfaces as
/// [`StoreError::Timeout`] and the pooled connection is dropped with it.
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgProfileStore {
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Highest applied migration, bounded by the same per-call timeout.
    pub async fn schema_version(&self) -> Result<Option<i32>, StoreError> {
        let call = async {
            applied_schema_version(&self.pool)
                .await
                .map_err(|err| match err {
                    MigrationError::Pool(err) => pool_fault(&err),
                    MigrationError::Postgres(err) => classify_pg_error(&err),
                })
        };
        self.bounded("schema_version", call).await
    }

    async fn bounded<T, E, F>(&self, operation: &'static str, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<StoreError>,
    {
        match tokio::time::timeout(self.query_timeout, call).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => {
                let millis = u64::try_from(self.query_timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(operation, timeout_ms = millis, "store call timed out");
                Err(StoreError::Timeout(millis))
            }
        }
    }
}

#[async_trait]
impl PrimaryStore for PgProfileStore {
    async fn get_primary(&self, id: &str) -> Result<Option<PrimaryRecord>, StoreError> {
        self.bounded("get_primary", fetch_primary_record(&self.pool, id))
            .await
    }
}

#[async_trait]
impl CandidateStore for PgProfileStore {
    async fn find_by_link_key(&self, key: &str) -> Result<Vec<CandidateRecord>, StoreError> {
        self.bounded(
            "find_by_link_key",
            fetch_candidates_by_link_key(&self.pool, key),
        )
        .await
    }

    async fn find_by_id(&self, id: &str) -> Result<Vec<CandidateRecord>, StoreError> {
        self.bounded("find_by_id", fetch_candidates_by_id(&self.pool, id))
            .await
    }

    async fn list_all(&self, limit: usize) -> Result<Vec<CandidateRecord>, StoreError> {
        self.bounded("list_all", list_candidates(&self.pool, limit))
            .await
    }

    async fn update(&self, id: &str, patch: &CandidatePatch) -> Result<(), StoreError> {
        self.bounded("update", update_candidate_link_key(&self.pool, id, patch))
            .await
    }
}

#[async_trait]
impl SkillStore for PgProfileStore {
    async fn get_skills_for(&self, candidate_id: &str) -> Result<Vec<SkillRef>, StoreError> {
        self.bounded(
            "get_skills_for",
            fetch_skills_for_candidate(&self.pool, candidate_id),
        )
        .await
    }
}

#[async_trait]
impl IdentityDirectory for PgProfileStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<String>, StoreError> {
        self.bounded("find_by_email", find_identity_by_email(&self.pool, email))
            .await
    }
}

//! Collaborator interfaces consumed by the profile engine.
//!
//! Every store is held behind `Arc<dyn ...>` so the engine can run against
//! PostgreSQL in production and [`MemoryProfileStore`] in tests.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{CandidatePatch, CandidateRecord, PrimaryRecord, SkillRef};

pub use memory::{MemoryProfileStore, Operation};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store call timed out after {0}ms")]
    Timeout(u64),
    #[error("store query failed: {0}")]
    Query(String),
    #[error("failed to map store row: {0}")]
    Mapping(String),
    #[error("record not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// True when the backing store could not be reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

#[async_trait]
pub trait PrimaryStore: Send + Sync {
    async fn get_primary(&self, id: &str) -> Result<Option<PrimaryRecord>, StoreError>;
}

#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn find_by_link_key(&self, key: &str) -> Result<Vec<CandidateRecord>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Vec<CandidateRecord>, StoreError>;

    /// Bounded listing used by the exhaustive scan.
    async fn list_all(&self, limit: usize) -> Result<Vec<CandidateRecord>, StoreError>;

    async fn update(&self, id: &str, patch: &CandidatePatch) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SkillStore: Send + Sync {
    async fn get_skills_for(&self, candidate_id: &str) -> Result<Vec<SkillRef>, StoreError>;
}

#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Returns the directory id registered for `email`, if any.
    async fn find_by_email(&self, email: &str) -> Result<Option<String>, StoreError>;
}

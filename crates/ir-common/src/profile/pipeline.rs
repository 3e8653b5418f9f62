use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use super::assembler::assemble_profile;
use super::repair::{DriftRepair, RepairOutcome};
use super::resolver::{DEFAULT_SCAN_LIMIT, LookupStrategy, Resolver};
use super::scoring::{ScoreSource, score_completion};
use super::selector::select_canonical;
use crate::api::profile_response::ProfileResponse;
use crate::model::{CandidateRecord, Identity, PrimaryRecord, SkillRef};
use crate::store::{CandidateStore, IdentityDirectory, PrimaryStore, SkillStore, StoreError};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("identity id must not be empty")]
    InvalidIdentity,
    #[error("primary store unavailable: {0}")]
    PrimaryUnavailable(StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub scan_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scan_limit: DEFAULT_SCAN_LIMIT,
        }
    }
}

/// A response plus how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProfile {
    pub response: ProfileResponse,
    pub strategy: Option<LookupStrategy>,
    pub candidate_count: usize,
    pub canonical_id: Option<String>,
    pub repair: RepairOutcome,
    pub score_source: ScoreSource,
}

/// Resolver → selector → drift repair → scorer → assembler.
pub struct ProfileEngine {
    primary: Arc<dyn PrimaryStore>,
    skills: Arc<dyn SkillStore>,
    resolver: Resolver,
    repair: DriftRepair,
}

impl ProfileEngine {
    pub fn new(
        primary: Arc<dyn PrimaryStore>,
        candidates: Arc<dyn CandidateStore>,
        skills: Arc<dyn SkillStore>,
        directory: Arc<dyn IdentityDirectory>,
        config: EngineConfig,
    ) -> Self {
        Self {
            primary,
            skills,
            resolver: Resolver::new(candidates.clone(), directory, config.scan_limit),
            repair: DriftRepair::new(candidates),
        }
    }

    /// Build an engine whose four collaborators are served by one store.
    pub fn from_store<S>(store: Arc<S>, config: EngineConfig) -> Self
    where
        S: PrimaryStore + CandidateStore + SkillStore + IdentityDirectory + 'static,
    {
        Self::new(store.clone(), store.clone(), store.clone(), store, config)
    }

    pub async fn build_profile(&self, identity: &Identity) -> Result<ProfileResponse, ProfileError> {
        self.resolve_profile(identity)
            .await
            .map(|resolved| resolved.response)
    }

    #[instrument(skip_all, fields(identity_id = %identity.id))]
    pub async fn resolve_profile(&self, identity: &Identity) -> Result<ResolvedProfile, ProfileError> {
        if identity.id.trim().is_empty() {
            return Err(ProfileError::InvalidIdentity);
        }

        let primary = self.load_primary(identity).await?;

        let resolution = self.resolver.resolve(identity).await;
        let candidate_count = resolution.candidates.len();
        let canonical = select_canonical(&resolution.candidates);

        let repaired = self.repair.repair(identity, canonical).await;
        let canonical = repaired.record;

        let skills = self.load_skills(canonical.as_ref()).await;
        let completion = score_completion(&primary, canonical.as_ref(), &skills);

        info!(
            strategy = resolution.strategy.map(|s| s.as_str()).unwrap_or("none"),
            candidate_count,
            canonical_id = canonical.as_ref().map(|c| c.id.as_str()).unwrap_or(""),
            repair = ?repaired.outcome,
            score_source = ?completion.source,
            profile_completion = completion.value,
            "profile_resolved"
        );

        let response = assemble_profile(identity, &primary, canonical.as_ref(), skills, completion);

        Ok(ResolvedProfile {
            response,
            strategy: resolution.strategy,
            candidate_count,
            canonical_id: canonical.map(|c| c.id),
            repair: repaired.outcome,
            score_source: completion.source,
        })
    }

    async fn load_primary(&self, identity: &Identity) -> Result<PrimaryRecord, ProfileError> {
        match self.primary.get_primary(&identity.id).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Ok(PrimaryRecord::default()),
            Err(err) if err.is_transport() => Err(ProfileError::PrimaryUnavailable(err)),
            Err(err) => {
                warn!(error = %err, "primary_lookup_failed");
                Ok(PrimaryRecord::default())
            }
        }
    }

    async fn load_skills(&self, canonical: Option<&CandidateRecord>) -> Vec<SkillRef> {
        let Some(candidate) = canonical else {
            return Vec::new();
        };

        match self.skills.get_skills_for(&candidate.id).await {
            Ok(skills) => skills,
            Err(err) => {
                warn!(candidate_id = %candidate.id, error = %err, "skill_lookup_failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::model::ProfileStatus;
    use crate::store::{MemoryProfileStore, Operation};

    fn engine(store: &Arc<MemoryProfileStore>) -> ProfileEngine {
        ProfileEngine::from_store(store.clone(), EngineConfig::default())
    }

    fn candidate(id: &str, link_key: &str) -> CandidateRecord {
        CandidateRecord {
            id: id.into(),
            link_key: Some(link_key.into()),
            ..CandidateRecord::default()
        }
    }

    #[tokio::test]
    async fn identity_without_candidate_scores_primary_fields() {
        let store = Arc::new(MemoryProfileStore::new().with_primary(
            "u1",
            PrimaryRecord {
                full_name: Some("Grace Hopper".into()),
                country: Some("US".into()),
                ..PrimaryRecord::default()
            },
        ));

        let resolved = engine(&store)
            .resolve_profile(&Identity::new("u1", Some("grace@example.com".into())))
            .await
            .unwrap();

        assert_eq!(resolved.response.status, "DRAFT");
        assert_eq!(resolved.response.profile_completion, 25);
        assert_eq!(resolved.response.first_name.as_deref(), Some("Grace"));
        assert_eq!(resolved.response.last_name.as_deref(), Some("Hopper"));
        assert_eq!(resolved.repair, RepairOutcome::NoCanonical);
        assert_eq!(resolved.score_source, ScoreSource::PrimaryFieldSet);
    }

    #[tokio::test]
    async fn stored_score_wins_regardless_of_field_counts() {
        let mut record = candidate("c1", "u1");
        record.completion_stored = Some(62.4);
        let store = Arc::new(MemoryProfileStore::new().with_candidate(record));

        let response = engine(&store)
            .build_profile(&Identity::new("u1", None))
            .await
            .unwrap();

        assert_eq!(response.profile_completion, 62);
    }

    #[tokio::test]
    async fn readiness_flag_reports_approved() {
        let mut record = candidate("c1", "u1");
        record.status = ProfileStatus::Submitted;
        record.readiness_flag = true;
        let store = Arc::new(MemoryProfileStore::new().with_candidate(record));

        let response = engine(&store)
            .build_profile(&Identity::new("u1", None))
            .await
            .unwrap();

        assert_eq!(response.status, "APPROVED");
    }

    #[tokio::test]
    async fn drifted_link_key_is_repaired_and_then_found_directly() {
        let store = Arc::new(MemoryProfileStore::new().with_candidate(candidate("u1", "old-key")));
        let engine = engine(&store);
        let identity = Identity::new("u1", None);

        let first = engine.resolve_profile(&identity).await.unwrap();
        assert_eq!(first.strategy, Some(LookupStrategy::CandidateId));
        assert_eq!(first.repair, RepairOutcome::Repaired);
        assert_eq!(
            store.candidate("u1").await.unwrap().link_key.as_deref(),
            Some("u1")
        );

        let second = engine.resolve_profile(&identity).await.unwrap();
        assert_eq!(second.strategy, Some(LookupStrategy::ExactLinkKey));
        assert_eq!(second.repair, RepairOutcome::InSync);
        assert_eq!(store.update_count().await, 1);
    }

    #[tokio::test]
    async fn repair_never_touches_unselected_records() {
        let mut winner = candidate("c-new", "U1 ");
        winner.updated_at = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let mut loser = candidate("c-old", "u1 ");
        loser.updated_at = Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
        let store = Arc::new(
            MemoryProfileStore::new()
                .with_candidate(loser.clone())
                .with_candidate(winner),
        );

        let resolved = engine(&store)
            .resolve_profile(&Identity::new("u1", None))
            .await
            .unwrap();

        assert_eq!(resolved.strategy, Some(LookupStrategy::ExhaustiveScan));
        assert_eq!(resolved.candidate_count, 2);
        assert_eq!(resolved.canonical_id.as_deref(), Some("c-new"));
        assert_eq!(store.candidate("c-old").await, Some(loser));
    }

    #[tokio::test]
    async fn primary_transport_fault_is_surfaced() {
        let store = Arc::new(MemoryProfileStore::new());
        store
            .fail_on(Operation::GetPrimary, StoreError::Unavailable("refused".into()))
            .await;

        let result = engine(&store).build_profile(&Identity::new("u1", None)).await;

        assert!(matches!(result, Err(ProfileError::PrimaryUnavailable(_))));
    }

    #[tokio::test]
    async fn other_primary_failures_fall_back_to_defaults() {
        let store = Arc::new(MemoryProfileStore::new());
        store
            .fail_on(Operation::GetPrimary, StoreError::Timeout(2000))
            .await;

        let response = engine(&store)
            .build_profile(&Identity::new("u1", None))
            .await
            .unwrap();

        assert_eq!(response.full_name, None);
        assert_eq!(response.profile_completion, 0);
        assert_eq!(response.status, "DRAFT");
    }

    #[tokio::test]
    async fn skill_failure_yields_empty_skills() {
        let store = Arc::new(
            MemoryProfileStore::new()
                .with_candidate(candidate("c1", "u1"))
                .with_skill(
                    "c1",
                    SkillRef {
                        id: "s1".into(),
                        name: "Rust".into(),
                    },
                ),
        );
        store
            .fail_on(Operation::GetSkills, StoreError::Query("boom".into()))
            .await;

        let response = engine(&store)
            .build_profile(&Identity::new("u1", None))
            .await
            .unwrap();

        assert!(response.skills.is_empty());
    }

    #[tokio::test]
    async fn skills_of_the_canonical_record_count_towards_completion() {
        let store = Arc::new(
            MemoryProfileStore::new()
                .with_candidate(candidate("c1", "u1"))
                .with_skill(
                    "c1",
                    SkillRef {
                        id: "s1".into(),
                        name: "Rust".into(),
                    },
                ),
        );

        let response = engine(&store)
            .build_profile(&Identity::new("u1", None))
            .await
            .unwrap();

        assert_eq!(response.skills.len(), 1);
        assert_eq!(response.profile_completion, 8);
    }

    #[tokio::test]
    async fn empty_identity_is_rejected() {
        let store = Arc::new(MemoryProfileStore::new());
        let result = engine(&store).build_profile(&Identity::new("  ", None)).await;
        assert!(matches!(result, Err(ProfileError::InvalidIdentity)));
    }
}

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::model::{CandidateRecord, Identity};
use crate::store::{CandidateStore, IdentityDirectory, StoreError};

/// Upper bound on rows pulled by the exhaustive scan.
pub const DEFAULT_SCAN_LIMIT: usize = 1000;

/// Candidate lookups, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupStrategy {
    /// `link_key = identity.id`
    ExactLinkKey,
    /// `link_key` equal to an alternative textual form of the id.
    CoercedLinkKey,
    /// The candidate's own primary key doubles as the link.
    CandidateId,
    /// Bounded in-memory scan with normalized comparison of `link_key` and `id`.
    ExhaustiveScan,
    /// Resolve the email through the identity directory, then match `link_key` or `id`.
    DirectoryEmail,
}

impl LookupStrategy {
    pub const ORDERED: [LookupStrategy; 5] = [
        LookupStrategy::ExactLinkKey,
        LookupStrategy::CoercedLinkKey,
        LookupStrategy::CandidateId,
        LookupStrategy::ExhaustiveScan,
        LookupStrategy::DirectoryEmail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LookupStrategy::ExactLinkKey => "exact_link_key",
            LookupStrategy::CoercedLinkKey => "coerced_link_key",
            LookupStrategy::CandidateId => "candidate_id",
            LookupStrategy::ExhaustiveScan => "exhaustive_scan",
            LookupStrategy::DirectoryEmail => "directory_email",
        }
    }
}

/// Outcome of a resolution: every plausible record plus the strategy that found them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub strategy: Option<LookupStrategy>,
    pub candidates: Vec<CandidateRecord>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

pub struct Resolver {
    candidates: Arc<dyn CandidateStore>,
    directory: Arc<dyn IdentityDirectory>,
    strategies: Vec<LookupStrategy>,
    scan_limit: usize,
}

impl Resolver {
    pub fn new(
        candidates: Arc<dyn CandidateStore>,
        directory: Arc<dyn IdentityDirectory>,
        scan_limit: usize,
    ) -> Self {
        Self {
            candidates,
            directory,
            strategies: LookupStrategy::ORDERED.to_vec(),
            scan_limit,
        }
    }

    /// Replace the strategy list, keeping the given order.
    pub fn with_strategies(mut self, strategies: Vec<LookupStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Run the strategies in order and stop at the first one that matches.
    ///
    /// A failing store call is logged and counts as "no match"; an identity
    /// that nothing matches yields an empty resolution.
    #[instrument(skip(self, identity), fields(identity_id = %identity.id))]
    pub async fn resolve(&self, identity: &Identity) -> Resolution {
        if identity.id.trim().is_empty() {
            warn!("resolve_called_with_empty_identity");
            return Resolution::default();
        }

        for strategy in &self.strategies {
            let found = match self.run_strategy(*strategy, identity).await {
                Ok(found) => dedupe_by_id(found),
                Err(err) => {
                    warn!(strategy = strategy.as_str(), error = %err, "lookup_strategy_failed");
                    continue;
                }
            };

            if !found.is_empty() {
                debug!(
                    strategy = strategy.as_str(),
                    matches = found.len(),
                    "lookup_strategy_matched"
                );
                return Resolution {
                    strategy: Some(*strategy),
                    candidates: found,
                };
            }
        }

        debug!("no_candidate_matched");
        Resolution::default()
    }

    async fn run_strategy(
        &self,
        strategy: LookupStrategy,
        identity: &Identity,
    ) -> Result<Vec<CandidateRecord>, StoreError> {
        match strategy {
            LookupStrategy::ExactLinkKey => self.candidates.find_by_link_key(&identity.id).await,
            LookupStrategy::CoercedLinkKey => {
                let mut found = Vec::new();
                for form in coerced_forms(&identity.id) {
                    match self.candidates.find_by_link_key(&form).await {
                        Ok(rows) => found.extend(rows),
                        Err(err) => {
                            warn!(form = %form, error = %err, "coerced_link_key_lookup_failed");
                        }
                    }
                }
                Ok(found)
            }
            LookupStrategy::CandidateId => self.candidates.find_by_id(&identity.id).await,
            LookupStrategy::ExhaustiveScan => {
                let wanted = normalize_key(&identity.id);
                let rows = self.candidates.list_all(self.scan_limit).await?;
                Ok(rows
                    .into_iter()
                    .filter(|candidate| {
                        candidate
                            .link_key
                            .as_deref()
                            .is_some_and(|key| normalize_key(key) == wanted)
                            || normalize_key(&candidate.id) == wanted
                    })
                    .collect())
            }
            LookupStrategy::DirectoryEmail => {
                let Some(email) = identity.email.as_deref() else {
                    return Ok(Vec::new());
                };
                let Some(resolved) = self.directory.find_by_email(email).await? else {
                    return Ok(Vec::new());
                };
                let resolved = resolved.trim();
                if resolved.is_empty() {
                    return Ok(Vec::new());
                }

                let mut found = self.candidates.find_by_link_key(resolved).await?;
                found.extend(self.candidates.find_by_id(resolved).await?);
                Ok(found)
            }
        }
    }
}

/// Case-, whitespace- and zero-padding-insensitive form of a key.
pub fn normalize_key(raw: &str) -> String {
    let trimmed = raw.trim();
    canonical_integer(trimmed).unwrap_or_else(|| trimmed.to_lowercase())
}

/// Alternative textual forms of `id` worth an exact-match lookup, excluding `id` itself.
pub fn coerced_forms(id: &str) -> Vec<String> {
    let trimmed = id.trim();
    let mut forms = vec![trimmed.to_string(), trimmed.to_lowercase()];
    if let Some(canonical) = canonical_integer(trimmed) {
        forms.push(canonical);
    }

    let mut seen = HashSet::new();
    forms
        .into_iter()
        .filter(|form| !form.is_empty() && form != id && seen.insert(form.clone()))
        .collect()
}

fn canonical_integer(text: &str) -> Option<String> {
    let digits = text.strip_prefix('+').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let stripped = digits.trim_start_matches('0');
    Some(if stripped.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    })
}

fn dedupe_by_id(records: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::model::CandidatePatch;
    use crate::store::{MemoryProfileStore, Operation};

    /// Delegates to a memory store but fails link-key lookups for one key.
    struct BrokenLinkKey {
        inner: Arc<MemoryProfileStore>,
        broken: &'static str,
    }

    #[async_trait]
    impl CandidateStore for BrokenLinkKey {
        async fn find_by_link_key(&self, key: &str) -> Result<Vec<CandidateRecord>, StoreError> {
            if key == self.broken {
                return Err(StoreError::Query("bad link key encoding".into()));
            }
            self.inner.find_by_link_key(key).await
        }

        async fn find_by_id(&self, id: &str) -> Result<Vec<CandidateRecord>, StoreError> {
            self.inner.find_by_id(id).await
        }

        async fn list_all(&self, limit: usize) -> Result<Vec<CandidateRecord>, StoreError> {
            self.inner.list_all(limit).await
        }

        async fn update(&self, id: &str, patch: &CandidatePatch) -> Result<(), StoreError> {
            self.inner.update(id, patch).await
        }
    }

    fn candidate(id: &str, link_key: Option<&str>) -> CandidateRecord {
        CandidateRecord {
            id: id.into(),
            link_key: link_key.map(str::to_string),
            ..CandidateRecord::default()
        }
    }

    fn resolver_for(store: &Arc<MemoryProfileStore>) -> Resolver {
        Resolver::new(store.clone(), store.clone(), DEFAULT_SCAN_LIMIT)
    }

    fn ids(resolution: &Resolution) -> Vec<&str> {
        resolution.candidates.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn coerced_forms_cover_whitespace_case_and_zero_padding() {
        assert_eq!(coerced_forms(" 0042 "), vec!["0042", "42"]);
        assert_eq!(coerced_forms("ABC-1"), vec!["abc-1"]);
        assert!(coerced_forms("plain").is_empty());
    }

    #[test]
    fn normalize_key_treats_numeric_forms_as_equal() {
        assert_eq!(normalize_key("00042"), normalize_key("42"));
        assert_eq!(normalize_key("+7"), "7");
        assert_eq!(normalize_key(" User-A "), "user-a");
        assert_eq!(normalize_key("000"), "0");
    }

    #[tokio::test]
    async fn exact_match_short_circuits_remaining_strategies() {
        let store = Arc::new(
            MemoryProfileStore::new()
                .with_candidate(candidate("c1", Some("u1")))
                .with_candidate(candidate("u1", Some("other"))),
        );

        let resolution = resolver_for(&store)
            .resolve(&Identity::new("u1", Some("u1@example.com".into())))
            .await;

        assert_eq!(resolution.strategy, Some(LookupStrategy::ExactLinkKey));
        assert_eq!(ids(&resolution), vec!["c1"]);
        assert_eq!(store.calls(Operation::FindByLinkKey).await, 1);
        assert_eq!(store.calls(Operation::FindById).await, 0);
        assert_eq!(store.calls(Operation::ListAll).await, 0);
        assert_eq!(store.calls(Operation::FindByEmail).await, 0);
    }

    #[tokio::test]
    async fn returns_every_match_not_just_one() {
        let store = Arc::new(
            MemoryProfileStore::new()
                .with_candidate(candidate("c1", Some("u1")))
                .with_candidate(candidate("c2", Some("u1")))
                .with_candidate(candidate("c3", Some("u2"))),
        );

        let resolution = resolver_for(&store).resolve(&Identity::new("u1", None)).await;
        assert_eq!(ids(&resolution), vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn coerced_lookup_keeps_matches_from_forms_that_succeed() {
        let inner = Arc::new(
            MemoryProfileStore::new()
                .with_candidate(candidate("c1", Some("0042")))
                .with_candidate(candidate("c2", Some("42"))),
        );
        let candidates = Arc::new(BrokenLinkKey {
            inner: inner.clone(),
            broken: "42",
        });
        let resolver = Resolver::new(candidates, inner, DEFAULT_SCAN_LIMIT)
            .with_strategies(vec![LookupStrategy::CoercedLinkKey]);

        // Untrimmed on purpose: both "0042" and "42" are coerced forms here.
        let identity = Identity {
            id: " 0042 ".into(),
            email: None,
        };
        let resolution = resolver.resolve(&identity).await;

        assert_eq!(resolution.strategy, Some(LookupStrategy::CoercedLinkKey));
        assert_eq!(ids(&resolution), vec!["c1"]);
    }

    #[tokio::test]
    async fn coerced_link_key_finds_zero_padded_numeric_key() {
        let store = Arc::new(MemoryProfileStore::new().with_candidate(candidate("c1", Some("42"))));

        let resolution = resolver_for(&store).resolve(&Identity::new("0042", None)).await;

        assert_eq!(resolution.strategy, Some(LookupStrategy::CoercedLinkKey));
        assert_eq!(ids(&resolution), vec!["c1"]);
    }

    #[tokio::test]
    async fn candidate_id_strategy_matches_own_primary_key() {
        let store = Arc::new(MemoryProfileStore::new().with_candidate(candidate("u1", Some("stale"))));

        let resolution = resolver_for(&store).resolve(&Identity::new("u1", None)).await;

        assert_eq!(resolution.strategy, Some(LookupStrategy::CandidateId));
        assert_eq!(store.calls(Operation::ListAll).await, 0);
    }

    #[tokio::test]
    async fn exhaustive_scan_runs_only_after_cheaper_strategies_miss() {
        let store = Arc::new(
            MemoryProfileStore::new()
                .with_candidate(candidate("c1", Some("  USER-7 ")))
                .with_candidate(candidate("c2", Some("user-8"))),
        );

        let resolution = resolver_for(&store).resolve(&Identity::new("User-7", None)).await;

        assert_eq!(resolution.strategy, Some(LookupStrategy::ExhaustiveScan));
        assert_eq!(ids(&resolution), vec!["c1"]);
        assert_eq!(store.calls(Operation::ListAll).await, 1);
    }

    #[tokio::test]
    async fn exhaustive_scan_respects_the_cap() {
        let store = Arc::new(
            MemoryProfileStore::new()
                .with_candidate(candidate("c1", Some("noise")))
                .with_candidate(candidate("c2", Some(" U1 "))),
        );

        let resolver = Resolver::new(store.clone(), store.clone(), 1);
        let resolution = resolver.resolve(&Identity::new("u1", None)).await;

        assert!(resolution.is_empty());
        assert_eq!(resolution.strategy, None);
    }

    #[tokio::test]
    async fn directory_fallback_matches_link_key_or_id() {
        let store = Arc::new(
            MemoryProfileStore::new()
                .with_directory_entry("legacy-9", "person@example.com")
                .with_candidate(candidate("c1", Some("legacy-9")))
                .with_candidate(candidate("legacy-9", None))
                .with_candidate(candidate("c3", Some("unrelated"))),
        );

        let resolution = resolver_for(&store)
            .resolve(&Identity::new("auth-1", Some("Person@Example.com".into())))
            .await;

        assert_eq!(resolution.strategy, Some(LookupStrategy::DirectoryEmail));
        assert_eq!(ids(&resolution), vec!["c1", "legacy-9"]);
    }

    #[tokio::test]
    async fn no_match_without_email_is_empty_not_an_error() {
        let store = Arc::new(MemoryProfileStore::new().with_candidate(candidate("c1", Some("x"))));

        let resolution = resolver_for(&store).resolve(&Identity::new("u1", None)).await;

        assert!(resolution.is_empty());
        assert_eq!(store.calls(Operation::FindByEmail).await, 0);
    }

    #[tokio::test]
    async fn failing_strategy_falls_through_to_the_next() {
        let store = Arc::new(MemoryProfileStore::new().with_candidate(candidate("u1", Some("u1"))));
        store
            .fail_on(Operation::FindByLinkKey, StoreError::Timeout(10))
            .await;

        let resolution = resolver_for(&store).resolve(&Identity::new("u1", None)).await;

        assert_eq!(resolution.strategy, Some(LookupStrategy::CandidateId));
        assert_eq!(ids(&resolution), vec!["u1"]);
    }

    #[tokio::test]
    async fn custom_strategy_order_is_honoured() {
        let store = Arc::new(
            MemoryProfileStore::new()
                .with_candidate(candidate("c1", Some("u1")))
                .with_candidate(candidate("u1", Some("zzz"))),
        );

        let resolver = resolver_for(&store).with_strategies(vec![
            LookupStrategy::CandidateId,
            LookupStrategy::ExactLinkKey,
        ]);
        let resolution = resolver.resolve(&Identity::new("u1", None)).await;

        assert_eq!(resolution.strategy, Some(LookupStrategy::CandidateId));
        assert_eq!(ids(&resolution), vec!["u1"]);
        assert_eq!(store.calls(Operation::FindByLinkKey).await, 0);
    }
}

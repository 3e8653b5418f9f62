use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CandidateStore, IdentityDirectory, PrimaryStore, SkillStore, StoreError};
use crate::model::{CandidatePatch, CandidateRecord, PrimaryRecord, SkillRef};

/// Store call names, used for call counting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetPrimary,
    FindByLinkKey,
    FindById,
    ListAll,
    Update,
    GetSkills,
    FindByEmail,
}

#[derive(Debug, Default)]
struct MemoryState {
    primaries: HashMap<String, PrimaryRecord>,
    candidates: Vec<CandidateRecord>,
    skills: HashMap<String, Vec<SkillRef>>,
    directory: Vec<(String, String)>,
    faults: HashMap<Operation, StoreError>,
    calls: HashMap<Operation, usize>,
    applied_updates: usize,
}

impl MemoryState {
    fn enter(&mut self, op: Operation) -> Result<(), StoreError> {
        *self.calls.entry(op).or_default() += 1;
        match self.faults.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// In-process implementation of every collaborator store.
///
/// Candidates keep insertion order, which mirrors a heap-ordered table scan
/// closely enough for the selector's stability guarantees to be observable.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    state: Mutex<MemoryState>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_primary(mut self, id: impl Into<String>, record: PrimaryRecord) -> Self {
        self.state.get_mut().primaries.insert(id.into(), record);
        self
    }

    pub fn with_candidate(mut self, record: CandidateRecord) -> Self {
        self.state.get_mut().candidates.push(record);
        self
    }

    pub fn with_skill(mut self, candidate_id: impl Into<String>, skill: SkillRef) -> Self {
        self.state
            .get_mut()
            .skills
            .entry(candidate_id.into())
            .or_default()
            .push(skill);
        self
    }

    pub fn with_directory_entry(mut self, id: impl Into<String>, email: impl Into<String>) -> Self {
        self.state
            .get_mut()
            .directory
            .push((id.into(), email.into()));
        self
    }

    /// Make every subsequent call to `op` fail with `err`.
    pub async fn fail_on(&self, op: Operation, err: StoreError) {
        self.state.lock().await.faults.insert(op, err);
    }

    pub async fn clear_faults(&self) {
        self.state.lock().await.faults.clear();
    }

    pub async fn calls(&self, op: Operation) -> usize {
        self.state
            .lock()
            .await
            .calls
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    /// Number of updates that actually reached the stored rows.
    pub async fn update_count(&self) -> usize {
        self.state.lock().await.applied_updates
    }

    pub async fn candidate(&self, id: &str) -> Option<CandidateRecord> {
        self.state
            .lock()
            .await
            .candidates
            .iter()
            .find(|candidate| candidate.id == id)
            .cloned()
    }
}

#[async_trait]
impl PrimaryStore for MemoryProfileStore {
    async fn get_primary(&self, id: &str) -> Result<Option<PrimaryRecord>, StoreError> {
        let mut state = self.state.lock().await;
        state.enter(Operation::GetPrimary)?;
        Ok(state.primaries.get(id).cloned())
    }
}

#[async_trait]
impl CandidateStore for MemoryProfileStore {
    async fn find_by_link_key(&self, key: &str) -> Result<Vec<CandidateRecord>, StoreError> {
        let mut state = self.state.lock().await;
        state.enter(Operation::FindByLinkKey)?;
        Ok(state
            .candidates
            .iter()
            .filter(|candidate| candidate.link_key.as_deref() == Some(key))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Vec<CandidateRecord>, StoreError> {
        let mut state = self.state.lock().await;
        state.enter(Operation::FindById)?;
        Ok(state
            .candidates
            .iter()
            .filter(|candidate| candidate.id == id)
            .cloned()
            .collect())
    }

    async fn list_all(&self, limit: usize) -> Result<Vec<CandidateRecord>, StoreError> {
        let mut state = self.state.lock().await;
        state.enter(Operation::ListAll)?;
        Ok(state.candidates.iter().take(limit).cloned().collect())
    }

    async fn update(&self, id: &str, patch: &CandidatePatch) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.enter(Operation::Update)?;

        let mut touched = false;
        for candidate in state.candidates.iter_mut().filter(|c| c.id == id) {
            candidate.link_key = Some(patch.link_key.clone());
            candidate.updated_at = Some(patch.updated_at);
            touched = true;
        }

        if !touched {
            return Err(StoreError::NotFound(format!("candidate {id}")));
        }

        state.applied_updates += 1;
        Ok(())
    }
}

#[async_trait]
impl SkillStore for MemoryProfileStore {
    async fn get_skills_for(&self, candidate_id: &str) -> Result<Vec<SkillRef>, StoreError> {
        let mut state = self.state.lock().await;
        state.enter(Operation::GetSkills)?;
        Ok(state.skills.get(candidate_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl IdentityDirectory for MemoryProfileStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<String>, StoreError> {
        let mut state = self.state.lock().await;
        state.enter(Operation::FindByEmail)?;
        let wanted = email.trim();
        Ok(state
            .directory
            .iter()
            .find(|(_, entry_email)| entry_email.trim().eq_ignore_ascii_case(wanted))
            .map(|(id, _)| id.clone()))
    }
}

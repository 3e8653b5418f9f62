pub mod api;
pub mod db;
pub mod logging;
pub mod model;
pub mod profile;
pub mod store;

pub use api::profile_response::ProfileResponse;
pub use model::{CandidatePatch, CandidateRecord, Identity, PrimaryRecord, ProfileStatus, SkillRef};
pub use profile::{EngineConfig, ProfileEngine, ProfileError, ResolvedProfile};
pub use store::{
    CandidateStore, IdentityDirectory, MemoryProfileStore, PrimaryStore, SkillStore, StoreError,
};

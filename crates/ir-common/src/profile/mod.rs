pub mod assembler;
pub mod pipeline;
pub mod repair;
pub mod resolver;
pub mod scoring;
pub mod selector;
pub mod status_rank;

pub use assembler::{assemble_profile, effective_status, split_full_name};
pub use pipeline::{EngineConfig, ProfileEngine, ProfileError, ResolvedProfile};
pub use repair::{DriftRepair, RepairOutcome, RepairResult, needs_repair};
pub use resolver::{DEFAULT_SCAN_LIMIT, LookupStrategy, Resolution, Resolver};
pub use scoring::{CompletionScore, ScoreSource, clamp_completion, score_completion};
pub use selector::select_canonical;
pub use status_rank::status_rank;

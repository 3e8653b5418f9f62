use axum::{Json, extract::State};
use ir_common::ProfileResponse;
use tracing::info;

use crate::SharedState;
use crate::auth::AuthUser;
use crate::error::ApiError;

/// The caller's normalized profile with its completion score.
pub async fn get_my_profile(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let resolved = state.engine.resolve_profile(&auth.identity).await?;

    info!(
        identity_id = %auth.identity.id,
        strategy = resolved.strategy.map(|s| s.as_str()).unwrap_or("none"),
        candidates = resolved.candidate_count,
        canonical_id = resolved.canonical_id.as_deref().unwrap_or(""),
        repair = ?resolved.repair,
        score_source = ?resolved.score_source,
        completion = resolved.response.profile_completion,
        "profile_served"
    );

    Ok(Json(resolved.response))
}

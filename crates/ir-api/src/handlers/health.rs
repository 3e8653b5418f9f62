use std::sync::atomic::Ordering;

use axum::{Json, extract::State};
use ir_common::StoreError;
use ir_common::db::SCHEMA_VERSION;
use serde_json::{Value, json};

use crate::SharedState;
use crate::error::ApiError;

pub async fn livez() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready once the profile schema is reachable and migrated to the version this
/// build expects; not ready while draining for shutdown.
pub async fn readyz(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    if !state.readiness.load(Ordering::SeqCst) {
        return Err(ApiError::NotReady("shutting_down".into()));
    }

    let applied = schema_verdict(state.store.schema_version().await)?;

    Ok(Json(json!({
        "status": "ok",
        "schemaVersion": applied,
        "application": env!("CARGO_PKG_NAME"),
    })))
}

fn schema_verdict(applied: Result<Option<i32>, StoreError>) -> Result<i32, ApiError> {
    match applied {
        Ok(Some(version)) if version >= SCHEMA_VERSION => Ok(version),
        Ok(Some(version)) => Err(ApiError::NotReady(format!(
            "profile schema at {version}, expected {SCHEMA_VERSION}"
        ))),
        Ok(None) => Err(ApiError::NotReady("profile schema not migrated".into())),
        Err(err) => Err(ApiError::NotReady(format!("profile store check failed: {err}"))),
    }
}

pub mod health;
pub mod profile;

use crate::error::ApiError;

pub async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}

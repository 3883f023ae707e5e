pub mod auth;
pub mod game_data;
pub mod reports;
pub mod stats;

use crate::error::AppError;
use crate::services::auth as auth_service;
use crate::state::AppState;
use ntex::web::HttpRequest;

/// Resolves the calling owner from the `Authorization` header.
pub(crate) fn owner_id(state: &AppState, req: &HttpRequest) -> Result<i64, AppError> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok());
    let token = auth_service::bearer_token(header)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".into()))?;
    auth_service::resolve_owner(state, token)
}

use crate::error::AppError;
use crate::handlers::owner_id;
use crate::models::game_data::*;
use crate::services::game_data as service;
use crate::state::AppState;
use ntex::web::{self, HttpRequest, HttpResponse};
use std::sync::Arc;

pub async fn get_progress(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let owner = owner_id(&state, &req)?;
    let doc = service::get_progress(&state.db, owner)?;
    Ok(HttpResponse::Ok().json(&doc))
}

pub async fn save_progress(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
    body: web::types::Json<ProgressDocument>,
) -> Result<HttpResponse, AppError> {
    let owner = owner_id(&state, &req)?;
    let doc = service::save_progress(&state.db, owner, body.into_inner())?;
    Ok(HttpResponse::Ok().json(&doc))
}

pub async fn get_modules(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let owner = owner_id(&state, &req)?;
    let doc = service::get_modules(&state.db, owner)?;
    Ok(HttpResponse::Ok().json(&doc))
}

pub async fn save_modules(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
    body: web::types::Json<ModulesDocument>,
) -> Result<HttpResponse, AppError> {
    let owner = owner_id(&state, &req)?;
    let doc = service::save_modules(&state.db, owner, body.into_inner())?;
    Ok(HttpResponse::Ok().json(&doc))
}

use crate::error::AppError;
use crate::handlers::owner_id;
use crate::services::stats as service;
use crate::state::AppState;
use ntex::web::{self, HttpRequest, HttpResponse};
use std::sync::Arc;

pub async fn get_daily_stats(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let owner = owner_id(&state, &req)?;
    let stats = service::get_daily_stats(&state, owner)?;
    Ok(HttpResponse::Ok().json(&stats))
}

pub async fn get_weekly_stats(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let owner = owner_id(&state, &req)?;
    let stats = service::get_weekly_stats(&state, owner)?;
    Ok(HttpResponse::Ok().json(&stats))
}

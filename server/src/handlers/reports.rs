use crate::error::AppError;
use crate::handlers::owner_id;
use crate::models::report::*;
use crate::services::{history, report as service};
use crate::state::AppState;
use crate::validation;
use ntex::web::{self, HttpRequest, HttpResponse};
use std::sync::Arc;

pub async fn submit_report(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
    body: web::types::Json<ReportSubmission>,
) -> Result<HttpResponse, AppError> {
    let owner = owner_id(&state, &req)?;
    let record = service::submit_report(&state, owner, body.into_inner())?;
    Ok(HttpResponse::Ok().json(&record))
}

pub async fn list_recent(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let owner = owner_id(&state, &req)?;
    let reports = history::recent_reports(&state, owner)?;
    Ok(HttpResponse::Ok().json(&reports))
}

pub async fn list_history(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
    query: web::types::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let owner = owner_id(&state, &req)?;
    let reports = history::history_page(&state, owner, query.skip, query.limit)?;
    Ok(HttpResponse::Ok().json(&reports))
}

pub async fn get_report(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
    path: web::types::Path<String>,
) -> Result<HttpResponse, AppError> {
    let owner = owner_id(&state, &req)?;
    let ts = validation::parse_timestamp_param(&path.into_inner())?;
    let report = service::get_full_report(&state, owner, ts)?;
    Ok(HttpResponse::Ok().json(&report))
}

pub async fn delete_report(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
    path: web::types::Path<String>,
) -> Result<HttpResponse, AppError> {
    let owner = owner_id(&state, &req)?;
    let ts = validation::parse_timestamp_param(&path.into_inner())?;
    if service::delete_report(&state, owner, ts)? {
        Ok(HttpResponse::Ok().json(&DeleteResult { deleted: true }))
    } else {
        Err(AppError::NotFound("Report not found".into()))
    }
}

pub async fn get_history_view(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let owner = owner_id(&state, &req)?;
    let view = history::build_history_view(&state, owner)?;
    Ok(HttpResponse::Ok().json(&view))
}

pub async fn get_month_reports(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
    path: web::types::Path<String>,
) -> Result<HttpResponse, AppError> {
    let owner = owner_id(&state, &req)?;
    let reports = history::reports_by_month(&state, owner, &path.into_inner())?;
    Ok(HttpResponse::Ok().json(&reports))
}

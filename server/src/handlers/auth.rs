use crate::error::AppError;
use crate::models::user::Credentials;
use crate::services::auth as service;
use crate::state::AppState;
use ntex::web::{self, HttpResponse};
use std::sync::Arc;

pub async fn register(
    state: web::types::State<Arc<AppState>>,
    body: web::types::Json<Credentials>,
) -> Result<HttpResponse, AppError> {
    let user = service::register(&state, body.into_inner())?;
    Ok(HttpResponse::Ok().json(&user))
}

pub async fn login(
    state: web::types::State<Arc<AppState>>,
    body: web::types::Json<Credentials>,
) -> Result<HttpResponse, AppError> {
    let token = service::login(&state, body.into_inner())?;
    Ok(HttpResponse::Ok().json(&token))
}

mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;
mod state;
mod validation;

use config::Config;
use db::Db;
use ntex::web;
use ntex_cors::Cors;
use services::cache::SystemClock;
use services::notify;
use state::AppState;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[ntex::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let db = Db::open(&config.database_path).map_err(|e| {
        tracing::error!(path = %config.database_path, error = %e, "failed to open database");
        std::io::Error::new(std::io::ErrorKind::Other, e)
    })?;

    let bind_addr = format!("{}:{}", config.host, config.port);
    let notifier = notify::from_webhook(config.slack_webhook_url.clone());
    let state = Arc::new(AppState::new(db, config, notifier, Arc::new(SystemClock)));

    tracing::info!(%bind_addr, "tower report server starting");

    web::HttpServer::new(move || {
        web::App::new()
            .state(state.clone())
            .wrap(
                Cors::new()
                    .allowed_origin("*")
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                    .allowed_headers(vec!["Content-Type", "Authorization"])
                    .max_age(3600)
                    .finish(),
            )
            .route("/api/health", web::get().to(health))
            // Accounts
            .route("/api/auth/register", web::post().to(handlers::auth::register))
            .route("/api/auth/login", web::post().to(handlers::auth::login))
            // Battle reports
            .route("/api/reports", web::post().to(handlers::reports::submit_report))
            .route("/api/reports", web::get().to(handlers::reports::list_recent))
            .route("/api/reports/history", web::get().to(handlers::reports::list_history))
            .route("/api/reports/{timestamp}", web::get().to(handlers::reports::get_report))
            .route("/api/reports/{timestamp}", web::delete().to(handlers::reports::delete_report))
            // Aggregates
            .route("/api/stats/daily", web::get().to(handlers::stats::get_daily_stats))
            .route("/api/stats/weekly", web::get().to(handlers::stats::get_weekly_stats))
            .route("/api/history", web::get().to(handlers::reports::get_history_view))
            .route("/api/history/{month}", web::get().to(handlers::reports::get_month_reports))
            // Game data documents
            .route("/api/progress", web::get().to(handlers::game_data::get_progress))
            .route("/api/progress", web::put().to(handlers::game_data::save_progress))
            .route("/api/modules", web::get().to(handlers::game_data::get_modules))
            .route("/api/modules", web::put().to(handlers::game_data::save_modules))
    })
    .bind(bind_addr)?
    .run()
    .await
}

async fn health() -> web::HttpResponse {
    web::HttpResponse::Ok().json(&serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

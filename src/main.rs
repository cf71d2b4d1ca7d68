mod cache;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;
mod state;
mod store;
mod validation;

use anyhow::Context;
use config::Config;
use db::Db;
use ntex::web;
use ntex_cors::Cors;
use state::AppState;
use std::sync::Arc;

#[ntex::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        decay = config.scoring.decay,
        step_weight = config.scoring.step_weight,
        max_magnitude = config.scoring.max_magnitude,
        "Configuration loaded"
    );

    let db = Db::open(&config.database_path, config.storage_timeout)
        .with_context(|| format!("Failed to open database at {}", config.database_path))?;
    tracing::info!(path = %config.database_path, "Database ready");

    let bind_address = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(Arc::new(db), config));
    services::refresh::spawn_refresher(state.clone())
        .context("Failed to start snapshot refresher")?;

    tracing::info!("Crowd energy server starting on {}", bind_address);

    web::HttpServer::new(move || {
        web::App::new()
            .state(state.clone())
            .wrap(
                Cors::new()
                    .allowed_origin("*")
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec!["Content-Type", "X-User-Id"])
                    .max_age(3600)
                    .finish(),
            )
            .route("/api/health", web::get().to(health))
            // Events
            .route("/api/events", web::post().to(handlers::events::create_event))
            .route("/api/events/{event_id}", web::get().to(handlers::events::get_event))
            .route("/api/events/{event_id}/end", web::post().to(handlers::events::end_event))
            // Scoring
            .route(
                "/api/events/{event_id}/samples",
                web::post().to(handlers::samples::submit_samples),
            )
            .route(
                "/api/events/{event_id}/timeline",
                web::get().to(handlers::timeline::get_energy_timeline),
            )
            .route(
                "/api/events/{event_id}/leaderboard",
                web::get().to(handlers::leaderboard::get_leaderboard),
            )
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}

async fn health() -> web::HttpResponse {
    web::HttpResponse::Ok().json(&serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

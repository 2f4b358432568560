//! # Blogicum Server
//!
//! The main entry point for the Actix-web HTTP server.

use actix_files::Files;
use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

use config::AppConfig;
use middleware::error::error_pages;
use observability::RequestIdMiddleware;
use state::AppState;
use telemetry::{TelemetryConfig, init_telemetry};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!(
        "Starting Blogicum server on {}:{}",
        config.host,
        config.port
    );

    let bind = (config.host.clone(), config.port);
    let state = AppState::new(config).await.map_err(|e| {
        tracing::error!("Startup failed: {}", e);
        std::io::Error::other(e)
    })?;

    let media_dir = state.config.media_dir.clone();
    std::fs::create_dir_all(&media_dir)?;
    tracing::info!(media_dir = %media_dir.display(), "Serving uploads under /media");

    HttpServer::new(move || {
        App::new()
            .wrap(error_pages())
            .wrap(RequestIdMiddleware)
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .app_data(web::FormConfig::default().limit(64 * 1024))
            .service(Files::new("/media", media_dir.clone()))
            .configure(|cfg| handlers::configure_routes(cfg, &state))
    })
    .bind(bind)?
    .run()
    .await
}

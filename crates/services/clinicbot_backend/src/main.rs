// File: crates/services/clinicbot_backend/src/main.rs

use clinicbot_backend::build_app;
use clinicbot_common::init_with_config;
use clinicbot_config::{env_vars::redact_secrets, load_config, AppConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

fn log_config(config: &AppConfig) {
    match serde_json::to_value(config) {
        Ok(mut value) => {
            redact_secrets(&mut value);
            info!("Effective config: {}", value);
        }
        Err(e) => error!("Could not render config: {}", e),
    }
}

#[tokio::main]
async fn main() {
    let config = match load_config() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    let _log_guard = init_with_config(&config.logging);
    log_config(&config);

    let app = match build_app(config.clone()).await {
        Ok(app) => app,
        Err(e) => {
            error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Cannot bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    if let Err(e) = axum::serve(listener, app.into_make_service()).await {
        error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}

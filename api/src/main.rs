use std::time::Duration;

use actix_web::{web, HttpServer};
use anyhow::Context;

use ds_api::telemetry::init_tracing;
use ds_api::{create_app, AppState};
use ds_shared::{AppConfig, Environment};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Environment-specific file first; plain .env fills the gaps
    let environment = Environment::from_env();
    dotenvy::from_filename(environment.env_file()).ok();
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging).context("Failed to initialize tracing")?;

    tracing::info!(
        environment = ?config.environment,
        provider = ?config.provider.kind,
        storage = ?config.storage.backend,
        "Starting DriveSync API server"
    );

    let bind_address = config.server.bind_address();
    let workers = config.server.workers;
    let keep_alive = Duration::from_secs(config.server.keep_alive);

    let state = web::Data::new(
        AppState::from_config(config)
            .await
            .context("Failed to initialize infrastructure")?,
    );

    let server_state = state.clone();
    let mut server = HttpServer::new(move || create_app(server_state.clone())).keep_alive(keep_alive);
    if workers > 0 {
        server = server.workers(workers);
    }

    let sweep_state = state.clone();
    let sweeper = actix_web::rt::spawn(async move { sweep_state.sweep_idle_sessions().await });

    tracing::info!(address = %bind_address, "Server listening");
    let result = server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run()
        .await;

    sweeper.abort();
    state.shutdown().await;
    result?;
    Ok(())
}

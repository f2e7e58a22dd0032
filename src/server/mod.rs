//! HTTP server

pub mod routes;
pub mod state;

use crate::config::Config;
use crate::core::eligibility::EligibilityPipeline;
use crate::core::import::ImportPipeline;
use crate::core::spapi::SpApiClient;
use crate::storage::memory_repository::{
    MemoryImportHistoryStore, MemoryProductRepository, MemoryTagStore,
};
use crate::storage::redis_progress::RedisProgressStore;
use crate::utils::error::{Result, TrackerError};
use actix_web::{web, App, HttpServer};
use state::AppState;
use std::sync::Arc;
use tracing::info;
use tracing_actix_web::TracingLogger;

/// Wire up shared state and run the HTTP server until shutdown
pub async fn run_server(config: Config) -> Result<()> {
    config.validate()?;
    let config = Arc::new(config);

    let progress = Arc::new(RedisProgressStore::connect(config.redis()).await?);
    // In-memory record store; swapped for a database-backed
    // implementation at the deployment seam.
    let repository = Arc::new(MemoryProductRepository::new());
    let tags = Arc::new(MemoryTagStore::new());
    let history = Arc::new(MemoryImportHistoryStore::new());
    let spapi = Arc::new(SpApiClient::new(config.spapi().clone()));

    let imports = Arc::new(ImportPipeline::new(
        progress.clone(),
        repository.clone(),
        tags,
        history,
        config.jobs().clone(),
    ));
    let eligibility = Arc::new(EligibilityPipeline::new(
        progress,
        repository,
        spapi,
        config.jobs().clone(),
    ));

    let state = AppState::new(config.clone(), imports, eligibility);
    let bind_addr = format!("{}:{}", config.server().host, config.server().port);
    info!("starting HTTP server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(TracingLogger::default())
            .configure(routes::configure_routes)
    })
    .bind(&bind_addr)
    .map_err(|e| TrackerError::Config(format!("could not bind {}: {}", bind_addr, e)))?
    .run()
    .await
    .map_err(|e| TrackerError::Internal(format!("server error: {}", e)))
}

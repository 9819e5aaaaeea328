use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokenholder_core::holders::{BatchSummary, HolderService, HolderServiceTrait};
use tokenholder_storage_sqlite::{
    db::{self, write_actor},
    HolderRepository,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, LogFormat};
use crate::loader::load_holders;

pub struct AppState {
    pub holder_service: Arc<dyn HolderServiceTrait>,
    pub db_path: String,
}

pub fn init_tracing(log_format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init(),
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path, config.pool_size)?;
    db::run_migrations(&pool)?;
    let writer = write_actor::spawn_writer((*pool).clone())?;

    let holder_repository = Arc::new(HolderRepository::new(pool.clone(), writer));
    let holder_service = Arc::new(HolderService::new(
        holder_repository,
        config.dedup_policy,
    ));

    Ok(Arc::new(AppState {
        holder_service,
        db_path,
    }))
}

/// Loads one file and writes it as a single batch.
pub async fn ingest_file(state: &AppState, path: &Path) -> anyhow::Result<BatchSummary> {
    let holders =
        load_holders(path).with_context(|| format!("failed to read {}", path.display()))?;
    tracing::info!("Loaded {} holder records from {}", holders.len(), path.display());

    let summary = state
        .holder_service
        .insert_holders(holders)
        .await
        .with_context(|| format!("failed to store holders from {}", path.display()))?;
    Ok(summary)
}

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, instrument, warn};

use super::service::TradeService;
use crate::season::CatalogRepository;
use crate::shared::AppError;

/// Configuration for the deferred trade processor
#[derive(Debug, Clone)]
pub struct TradeProcessorConfig {
    /// How often accepted trades are retried
    pub processing_interval: Duration,
}

impl Default for TradeProcessorConfig {
    fn default() -> Self {
        Self {
            processing_interval: Duration::from_secs(60),
        }
    }
}

/// Starts the background task that processes trades accepted while a match
/// was live
#[instrument(skip(catalog, trade_service))]
pub async fn start_trade_processor(
    catalog: Arc<dyn CatalogRepository>,
    trade_service: Arc<TradeService>,
    config: TradeProcessorConfig,
) {
    info!(
        processing_interval_secs = config.processing_interval.as_secs(),
        "Starting deferred trade processor"
    );

    let mut ticker = interval(config.processing_interval);

    loop {
        ticker.tick().await;

        match process_all_seasons(&catalog, &trade_service).await {
            Ok(0) => {}
            Ok(processed) => info!(processed, "Deferred trades processed"),
            Err(e) => error!(error = %e, "Deferred trade processing failed"),
        }
    }
}

/// One sweep over every season; returns how many trades were closed
async fn process_all_seasons(
    catalog: &Arc<dyn CatalogRepository>,
    trade_service: &Arc<TradeService>,
) -> Result<usize, AppError> {
    let mut processed = 0;

    for season in catalog.list_seasons().await? {
        match trade_service.process_ready_trades(season.id).await {
            Ok(report) => processed += report.processed.len(),
            Err(e) => {
                warn!(season_id = season.id, error = %e, "Failed to process trades for season");
            }
        }
    }

    Ok(processed)
}

use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fantasy_cricket::{
    build_router,
    config::AppConfig,
    shared::{AppState, AppStateBuilder},
    stats::StatsLeagueSubscriber,
    storage::PostgresStore,
    trade::{start_trade_processor, TradeProcessorConfig},
    EventSubscription,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fantasy_cricket=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting fantasy cricket engine");

    let config = AppConfig::from_env();
    let app_state = match build_state(&config).await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to initialise storage");
            std::process::exit(1);
        }
    };

    // Read views follow committed writes through the event bus
    let stats_subscriber = Arc::new(StatsLeagueSubscriber::new(
        app_state.stats.clone(),
        app_state.event_bus.clone(),
    ));
    let _stats_subscription =
        EventSubscription::new(stats_subscriber, app_state.event_bus.clone()).start();

    tokio::spawn(start_trade_processor(
        app_state.catalog.clone(),
        app_state.trade_service.clone(),
        TradeProcessorConfig {
            processing_interval: config.trade_processing_interval,
        },
    ));

    let app = build_router(app_state);

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, bind_addr = %config.bind_addr, "Failed to bind listener");
            std::process::exit(1);
        }
    };
    info!(bind_addr = %config.bind_addr, "Server running");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Server terminated");
    }
}

async fn build_state(config: &AppConfig) -> Result<AppState, fantasy_cricket::AppError> {
    let builder = AppStateBuilder::new().with_config(config.clone());
    match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url).await?;
            Ok(builder.build(Arc::new(store)))
        }
        None => {
            info!("DATABASE_URL not set, using in-memory store");
            Ok(builder.build_in_memory())
        }
    }
}

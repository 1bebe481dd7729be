pub mod api;
pub mod config;
pub mod data_structures;

use crate::data_structures::AppState;
use pricelens::api::EstimatorBuilder;
use pricelens::services::{ChartApiClient, MarketDataConfig, StockViewer};
use std::{net::SocketAddr, sync::Arc};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() {
    let app_config = config::AppConfig::load();

    // Initialize tracing with node_name in all logs
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    // Set a global span with node_name for all subsequent logs
    let _span = tracing::info_span!("node", name = %app_config.node_name).entered();

    tracing::info!("Starting pricelens-web");
    tracing::info!(?app_config.environment, port = app_config.port, "Loaded configuration");

    let estimator = EstimatorBuilder::new()
        .with_vocabulary_path(&app_config.vocabulary_path)
        .with_dataset_path(&app_config.dataset_path)
        .with_pipeline_path(&app_config.pipeline_path)
        .with_auto_build(app_config.auto_build_vocabulary)
        .build()
        .unwrap_or_else(|e| panic!("Failed to load estimator: {:#}", e));
    tracing::info!(
        manufacturers = estimator.vocabulary().manufacturers().len(),
        pipeline = %app_config.pipeline_path.display(),
        "Estimator ready"
    );

    let market_client = ChartApiClient::new(MarketDataConfig {
        base_url: app_config.market_data_url.clone(),
        rate_limit_per_minute: app_config.market_data_rate_limit,
        ..MarketDataConfig::default()
    })
    .unwrap_or_else(|e| panic!("Failed to create market data client: {}", e));
    let viewer = StockViewer::new(Arc::new(market_client), app_config.market_timezone);

    let app_state = AppState {
        estimator: Arc::new(estimator),
        viewer: Arc::new(viewer),
    };

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(app_config.rate_limit.per_second)
            .burst_size(app_config.rate_limit.burst_size)
            .finish()
            .unwrap(),
    );

    let app = api::router(app_state)
        .layer(GovernorLayer::new(governor_conf))
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], app_config.port));
    tracing::info!(%addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .unwrap();
}

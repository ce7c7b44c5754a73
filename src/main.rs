//! gavel-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use gavel_gateway::api;
use gavel_gateway::app_state::AppState;
use gavel_gateway::config::GatewayConfig;
use gavel_gateway::domain::AuctionLobby;
use gavel_gateway::ledger::memory::MemoryLedger;
use gavel_gateway::ledger::postgres::PostgresLedger;
use gavel_gateway::ledger::BidLedger;
use gavel_gateway::service::AuctionService;
use gavel_gateway::ws::handler::subscribe_handler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting gavel-gateway");

    // Select the ledger backend
    let ledger: Arc<dyn BidLedger> = if config.persistence_enabled {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(std::time::Duration::from_secs(
                config.database_connect_timeout_secs,
            ))
            .connect(&config.database_url)
            .await?;
        sqlx::migrate!().run(&pool).await?;
        Arc::new(PostgresLedger::new(pool))
    } else {
        tracing::warn!("persistence disabled, auctions and bids are in-memory only");
        Arc::new(MemoryLedger::new())
    };

    // Build domain and service layers
    let lobby = Arc::new(AuctionLobby::new());
    let auction_service = Arc::new(AuctionService::new(ledger, Arc::clone(&lobby)));

    // Build application state
    let app_state = AppState {
        auction_service,
        lobby,
        pump_settings: config.pump_settings(),
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws/auctions/{id}", get(subscribe_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

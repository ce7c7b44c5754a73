//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::AuctionLobby;
use crate::service::AuctionService;
use crate::ws::pump::PumpSettings;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Auction service for lifecycle operations.
    pub auction_service: Arc<AuctionService>,
    /// Registry of live auction rooms.
    pub lobby: Arc<AuctionLobby>,
    /// Per-connection pump tunables.
    pub pump_settings: PumpSettings,
}

//! Auction service: orchestrates auction lifecycle around the room engine.
//!
//! Owns the creation entry point (persist the record, register the room in
//! the lobby, spawn the arbitration loop bound to the end instant) and the
//! read/cancel operations the REST surface exposes.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{AuctionId, AuctionLobby, AuctionRoom};
use crate::error::GatewayError;
use crate::ledger::models::{AuctionRecord, Bid, NewAuction};
use crate::ledger::BidLedger;

/// Orchestration layer for auction lifecycle operations.
///
/// Stateless coordinator: holds the ledger for durable records and the
/// lobby for live rooms. The arbitration loops it spawns outlive any HTTP
/// request that created them.
#[derive(Debug)]
pub struct AuctionService {
    ledger: Arc<dyn BidLedger>,
    lobby: Arc<AuctionLobby>,
}

impl AuctionService {
    /// Creates a new `AuctionService`.
    #[must_use]
    pub fn new(ledger: Arc<dyn BidLedger>, lobby: Arc<AuctionLobby>) -> Self {
        Self { ledger, lobby }
    }

    /// Returns a reference to the lobby of live rooms.
    #[must_use]
    pub fn lobby(&self) -> &Arc<AuctionLobby> {
        &self.lobby
    }

    /// Persists a new auction and starts its room.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for a non-positive base
    /// price or an end instant not in the future, or a persistence error
    /// from the ledger.
    pub async fn create_auction(&self, auction: NewAuction) -> Result<AuctionRecord, GatewayError> {
        if auction.base_price <= 0.0 || !auction.base_price.is_finite() {
            return Err(GatewayError::InvalidRequest(
                "base_price must be positive".to_string(),
            ));
        }
        if auction.item_name.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "item_name must not be empty".to_string(),
            ));
        }
        if auction.ends_at <= Utc::now() {
            return Err(GatewayError::InvalidRequest(
                "ends_at must be in the future".to_string(),
            ));
        }

        let record = self.ledger.create_auction(auction).await?;

        let (room, handle) = AuctionRoom::new(record.id, record.ends_at, Arc::clone(&self.ledger));
        self.lobby
            .open(handle)
            .await
            .map_err(|dup| GatewayError::DuplicateAuction(*dup.0.as_uuid()))?;
        tokio::spawn(room.run(Arc::clone(&self.lobby)));

        tracing::info!(auction_id = %record.id, ends_at = %record.ends_at, "auction opened");
        Ok(record)
    }

    /// Fetches an auction record plus whether its room is still running.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AuctionNotFound`] for an unknown auction.
    pub async fn get_auction(&self, id: AuctionId) -> Result<(AuctionRecord, bool), GatewayError> {
        let record = self.ledger.get_auction(id).await?;
        let live = self.lobby.lookup(id).await.is_some();
        Ok((record, live))
    }

    /// Returns the bid history for an auction, highest amount first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AuctionNotFound`] for an unknown auction.
    pub async fn list_bids(&self, id: AuctionId) -> Result<Vec<Bid>, GatewayError> {
        // Distinguish "no bids" from "no such auction".
        let _ = self.ledger.get_auction(id).await?;
        Ok(self.ledger.list_bids(id).await?)
    }

    /// Cancels a live auction: the room drains as if its deadline fired.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AuctionNotLive`] when no room is running.
    pub async fn cancel_auction(&self, id: AuctionId) -> Result<(), GatewayError> {
        let Some(room) = self.lobby.lookup(id).await else {
            return Err(GatewayError::AuctionNotLive(*id.as_uuid()));
        };
        room.cancel();
        tracing::info!(auction_id = %id, "auction cancel requested");
        Ok(())
    }
}

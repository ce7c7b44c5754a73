//! In-process ledger used when persistence is disabled and in tests.
//!
//! Holds auctions and bids in a `HashMap` behind a single async mutex. The
//! mutex plays the role the database transaction plays in
//! [`super::postgres::PostgresLedger`]: check-and-insert is atomic, so the
//! accepted amounts for one auction are strictly increasing even under
//! concurrent submitters.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::models::{AuctionRecord, Bid, NewAuction};
use super::{BidLedger, LedgerError};
use crate::domain::AuctionId;

#[derive(Debug, Default)]
struct LedgerState {
    auctions: HashMap<AuctionId, AuctionRecord>,
    bids: HashMap<AuctionId, Vec<Bid>>,
}

/// Memory-backed [`BidLedger`] implementation.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an auction record directly, bypassing validation. Test helper.
    pub async fn seed_auction(&self, record: AuctionRecord) {
        let mut state = self.state.lock().await;
        state.auctions.insert(record.id, record);
    }
}

#[async_trait]
impl BidLedger for MemoryLedger {
    async fn create_auction(&self, auction: NewAuction) -> Result<AuctionRecord, LedgerError> {
        let record = AuctionRecord {
            id: AuctionId::new(),
            seller_id: auction.seller_id,
            item_name: auction.item_name,
            description: auction.description,
            base_price: auction.base_price,
            ends_at: auction.ends_at,
            created_at: Utc::now(),
        };
        let mut state = self.state.lock().await;
        state.auctions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_auction(&self, auction_id: AuctionId) -> Result<AuctionRecord, LedgerError> {
        let state = self.state.lock().await;
        state
            .auctions
            .get(&auction_id)
            .cloned()
            .ok_or(LedgerError::AuctionNotFound(auction_id))
    }

    async fn submit_bid(
        &self,
        auction_id: AuctionId,
        bidder_id: Uuid,
        amount: f64,
    ) -> Result<Bid, LedgerError> {
        // Single lock section = the transaction boundary.
        let mut state = self.state.lock().await;
        let base_price = state
            .auctions
            .get(&auction_id)
            .map(|a| a.base_price)
            .ok_or(LedgerError::AuctionNotFound(auction_id))?;

        let highest = state
            .bids
            .get(&auction_id)
            .and_then(|bids| bids.iter().map(|b| b.amount).fold(None, f64_max));

        if amount <= base_price || highest.is_some_and(|h| amount <= h) {
            return Err(LedgerError::BidTooLow);
        }

        let bid = Bid {
            id: Uuid::new_v4(),
            auction_id,
            bidder_id,
            amount,
            created_at: Utc::now(),
        };
        state.bids.entry(auction_id).or_default().push(bid.clone());
        Ok(bid)
    }

    async fn list_bids(&self, auction_id: AuctionId) -> Result<Vec<Bid>, LedgerError> {
        let state = self.state.lock().await;
        let mut bids = state.bids.get(&auction_id).cloned().unwrap_or_default();
        bids.sort_by(|a, b| b.amount.total_cmp(&a.amount));
        Ok(bids)
    }
}

fn f64_max(acc: Option<f64>, x: f64) -> Option<f64> {
    Some(acc.map_or(x, |a| a.max(x)))
}

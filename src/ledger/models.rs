//! Storage models for auctions and bids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::AuctionId;

/// A persisted bid row from the `bids` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    /// Storage-assigned bid identifier.
    pub id: Uuid,
    /// Auction this bid belongs to.
    pub auction_id: AuctionId,
    /// Bidder that placed it.
    pub bidder_id: Uuid,
    /// Accepted amount.
    pub amount: f64,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A persisted auction row from the `auctions` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionRecord {
    /// Auction identifier.
    pub id: AuctionId,
    /// Seller that listed the item.
    pub seller_id: Uuid,
    /// Item name shown to bidders.
    pub item_name: String,
    /// Optional item description.
    pub description: String,
    /// Minimum amount the first bid must exceed.
    pub base_price: f64,
    /// Absolute expiry instant of the auction.
    pub ends_at: DateTime<Utc>,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new auction record.
#[derive(Debug, Clone)]
pub struct NewAuction {
    /// Seller that lists the item.
    pub seller_id: Uuid,
    /// Item name.
    pub item_name: String,
    /// Item description.
    pub description: String,
    /// Base price (strict floor for the first bid).
    pub base_price: f64,
    /// Absolute expiry instant.
    pub ends_at: DateTime<Utc>,
}

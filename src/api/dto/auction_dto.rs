//! Auction-related DTOs for create, get, and bid-history operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Request body for `POST /auctions`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAuctionRequest {
    /// Item name shown to bidders (must not be blank).
    pub item_name: String,
    /// Optional item description.
    #[serde(default)]
    pub description: String,
    /// Strict floor for the first bid; must be positive.
    pub base_price: f64,
    /// Absolute expiry instant; must be in the future.
    pub ends_at: DateTime<Utc>,
}

/// Response body for `POST /auctions` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateAuctionResponse {
    /// Unique auction identifier.
    pub auction_id: Uuid,
    /// Item name echoed from the request.
    pub item_name: String,
    /// Base price echoed from the request.
    pub base_price: f64,
    /// Expiry instant echoed from the request.
    pub ends_at: DateTime<Utc>,
    /// Server creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Single auction detail for `GET /auctions/{id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuctionDetailResponse {
    /// Auction identifier.
    pub auction_id: Uuid,
    /// Seller that listed the item.
    pub seller_id: Uuid,
    /// Item name.
    pub item_name: String,
    /// Item description.
    pub description: String,
    /// Base price.
    pub base_price: f64,
    /// Expiry instant.
    pub ends_at: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Whether a room is currently accepting bids.
    pub live: bool,
}

/// One bid in a history response.
#[derive(Debug, Serialize, ToSchema)]
pub struct BidDto {
    /// Bidder that placed the bid.
    pub bidder_id: Uuid,
    /// Accepted amount.
    pub amount: f64,
    /// When storage accepted it.
    pub created_at: DateTime<Utc>,
}

/// Bid history for `GET /auctions/{id}/bids`, highest amount first.
#[derive(Debug, Serialize, ToSchema)]
pub struct BidListResponse {
    /// Accepted bids, highest first.
    pub data: Vec<BidDto>,
}

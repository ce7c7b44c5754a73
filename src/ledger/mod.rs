//! Bid ledger: the transactional storage boundary for auctions and bids.
//!
//! The ledger is the sole authority on bid acceptance. [`BidLedger`] is an
//! object-safe async trait with two implementations: [`postgres::PostgresLedger`]
//! for durable storage and [`memory::MemoryLedger`] for running without a
//! database (and for tests).

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::AuctionId;
use models::{AuctionRecord, Bid, NewAuction};

/// Errors surfaced by the ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The bid did not strictly exceed both the base price and the current
    /// highest accepted bid. Expected and never fatal.
    #[error("the bid value is too low or a higher bid was already placed")]
    BidTooLow,

    /// No auction record exists for the given identifier.
    #[error("auction not found: {0}")]
    AuctionNotFound(AuctionId),

    /// Underlying storage failure (connection loss, constraint violation, …).
    #[error("storage error: {0}")]
    Storage(String),
}

/// Transactional storage contract for auctions and bids.
///
/// `submit_bid` must be safe under concurrent callers across rooms and
/// processes: two racing submissions for the same auction may never both
/// succeed with a non-increasing sequence of amounts. That guarantee comes
/// from the implementation's transaction isolation, not from any caller's
/// single-threadedness.
#[async_trait]
pub trait BidLedger: Send + Sync + std::fmt::Debug {
    /// Persists a new auction record and returns it with storage-assigned
    /// fields filled in.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] on storage failure.
    async fn create_auction(&self, auction: NewAuction) -> Result<AuctionRecord, LedgerError>;

    /// Fetches one auction record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AuctionNotFound`] when no record exists, or
    /// [`LedgerError::Storage`] on storage failure.
    async fn get_auction(&self, auction_id: AuctionId) -> Result<AuctionRecord, LedgerError>;

    /// Validates and records a bid inside a single atomic transaction.
    ///
    /// Reads the auction's base price and current highest accepted bid,
    /// rejects unless `amount` is strictly greater than both, otherwise
    /// inserts and returns the new highest bid. Absence of any prior bid is
    /// not an error; the base price alone is the floor.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::BidTooLow`] on policy rejection,
    /// [`LedgerError::AuctionNotFound`] for an unknown auction, or
    /// [`LedgerError::Storage`] on storage failure.
    async fn submit_bid(
        &self,
        auction_id: AuctionId,
        bidder_id: Uuid,
        amount: f64,
    ) -> Result<Bid, LedgerError>;

    /// Returns all bids for an auction, highest amount first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] on storage failure.
    async fn list_bids(&self, auction_id: AuctionId) -> Result<Vec<Bid>, LedgerError>;
}

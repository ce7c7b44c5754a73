//! PostgreSQL implementation of the bid ledger.
//!
//! `submit_bid` runs its policy check and insert inside one transaction,
//! locking the auction row so that two racing submissions for the same
//! auction are linearized by the database regardless of which process or
//! room they came from.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{AuctionRecord, Bid, NewAuction};
use super::{BidLedger, LedgerError};
use crate::domain::AuctionId;

/// PostgreSQL-backed [`BidLedger`] using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Creates a new ledger over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn storage(e: sqlx::Error) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

#[async_trait]
impl BidLedger for PostgresLedger {
    async fn create_auction(&self, auction: NewAuction) -> Result<AuctionRecord, LedgerError> {
        let id = AuctionId::new();
        let row = sqlx::query_as::<_, (DateTime<Utc>,)>(
            "INSERT INTO auctions (id, seller_id, item_name, description, base_price, ends_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING created_at",
        )
        .bind(id.as_uuid())
        .bind(auction.seller_id)
        .bind(&auction.item_name)
        .bind(&auction.description)
        .bind(auction.base_price)
        .bind(auction.ends_at)
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        Ok(AuctionRecord {
            id,
            seller_id: auction.seller_id,
            item_name: auction.item_name,
            description: auction.description,
            base_price: auction.base_price,
            ends_at: auction.ends_at,
            created_at: row.0,
        })
    }

    async fn get_auction(&self, auction_id: AuctionId) -> Result<AuctionRecord, LedgerError> {
        let row = sqlx::query_as::<_, (Uuid, Uuid, String, String, f64, DateTime<Utc>, DateTime<Utc>)>(
            "SELECT id, seller_id, item_name, description, base_price, ends_at, created_at \
             FROM auctions WHERE id = $1",
        )
        .bind(auction_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        let Some((id, seller_id, item_name, description, base_price, ends_at, created_at)) = row
        else {
            return Err(LedgerError::AuctionNotFound(auction_id));
        };

        Ok(AuctionRecord {
            id: AuctionId::from_uuid(id),
            seller_id,
            item_name,
            description,
            base_price,
            ends_at,
            created_at,
        })
    }

    async fn submit_bid(
        &self,
        auction_id: AuctionId,
        bidder_id: Uuid,
        amount: f64,
    ) -> Result<Bid, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        // Row lock on the auction serializes concurrent submissions.
        let base_price: Option<f64> =
            sqlx::query_scalar("SELECT base_price FROM auctions WHERE id = $1 FOR UPDATE")
                .bind(auction_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(storage)?;

        let Some(base_price) = base_price else {
            return Err(LedgerError::AuctionNotFound(auction_id));
        };

        let highest: Option<f64> =
            sqlx::query_scalar("SELECT MAX(amount) FROM bids WHERE auction_id = $1")
                .bind(auction_id.as_uuid())
                .fetch_one(&mut *tx)
                .await
                .map_err(storage)?;

        if amount <= base_price || highest.is_some_and(|h| amount <= h) {
            // Dropping the transaction rolls it back.
            return Err(LedgerError::BidTooLow);
        }

        let (id, created_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            "INSERT INTO bids (auction_id, bidder_id, amount) VALUES ($1, $2, $3) \
             RETURNING id, created_at",
        )
        .bind(auction_id.as_uuid())
        .bind(bidder_id)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;

        Ok(Bid {
            id,
            auction_id,
            bidder_id,
            amount,
            created_at,
        })
    }

    async fn list_bids(&self, auction_id: AuctionId) -> Result<Vec<Bid>, LedgerError> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, f64, DateTime<Utc>)>(
            "SELECT id, bidder_id, amount, created_at FROM bids \
             WHERE auction_id = $1 ORDER BY amount DESC",
        )
        .bind(auction_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(rows
            .into_iter()
            .map(|(id, bidder_id, amount, created_at)| Bid {
                id,
                auction_id,
                bidder_id,
                amount,
                created_at,
            })
            .collect())
    }
}

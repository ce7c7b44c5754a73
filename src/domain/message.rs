//! Domain messages exchanged through an auction room.
//!
//! [`RoomMessage`] is the tagged union that flows through a room's event
//! queue and out to each participant's bounded send queue. Inbound variants
//! carry the bidder identifier stamped by the connection pump; it is never
//! taken from the wire payload.

use uuid::Uuid;

/// A message flowing into or out of an auction room.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomMessage {
    /// A bidder asks to place a bid (inbound). `bidder_id` is stamped by the
    /// pump that decoded the frame.
    PlaceBid {
        /// Server-stamped bidder identifier.
        bidder_id: Uuid,
        /// Offered amount.
        amount: f64,
    },

    /// A frame from this bidder could not be decoded (inbound). Routed back
    /// to the originator only.
    InvalidInput {
        /// Server-stamped bidder identifier.
        bidder_id: Uuid,
        /// Human-readable description of what was wrong.
        detail: String,
    },

    /// The bidder's own bid was accepted by the ledger.
    BidAccepted {
        /// The accepted amount.
        amount: f64,
    },

    /// The bidder's own bid was rejected.
    BidRejected {
        /// Why the bid was rejected.
        reason: String,
    },

    /// Another participant placed a new highest bid.
    HigherBid {
        /// The new highest amount.
        amount: f64,
    },

    /// The auction deadline elapsed or the auction was cancelled.
    AuctionFinished,
}

impl RoomMessage {
    /// Returns the originating bidder for inbound variants.
    #[must_use]
    pub fn origin(&self) -> Option<Uuid> {
        match self {
            Self::PlaceBid { bidder_id, .. } | Self::InvalidInput { bidder_id, .. } => {
                Some(*bidder_id)
            }
            _ => None,
        }
    }
}

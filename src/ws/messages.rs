//! Wire-level message envelope for the auction WebSocket.
//!
//! Every frame, inbound or outbound, is one JSON object of the shape
//! `{kind, message?, bid_value?, user_id?}`. The only kind a client may
//! send is `place_bid`; `user_id` is always stamped server-side and never
//! trusted from the payload.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::RoomMessage;

/// Discriminator for wire messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireKind {
    /// Client → Server: place a bid.
    PlaceBid,
    /// Server → Client: the last frame could not be understood.
    InvalidInput,
    /// Server → Client: your bid was accepted.
    BidAccepted,
    /// Server → Client: your bid was rejected.
    BidRejected,
    /// Server → Client: another participant placed a new highest bid.
    HigherBid,
    /// Server → Client: the auction has finished.
    AuctionFinished,
}

/// Flat JSON envelope carried on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Message kind discriminator.
    pub kind: WireKind,
    /// Human-readable text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Bid amount, where applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid_value: Option<f64>,
    /// Bidder the message concerns. Server-stamped; ignored on input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

impl WireMessage {
    /// Converts an inbound frame into a domain message, stamping the
    /// authenticated bidder identifier.
    ///
    /// # Errors
    ///
    /// Returns a human-readable description when the frame is not a valid
    /// inbound message (wrong kind, or `place_bid` without a value).
    pub fn into_inbound(self, bidder_id: Uuid) -> Result<RoomMessage, String> {
        match self.kind {
            WireKind::PlaceBid => {
                let Some(amount) = self.bid_value else {
                    return Err("place_bid requires a bid_value".to_string());
                };
                Ok(RoomMessage::PlaceBid { bidder_id, amount })
            }
            other => Err(format!("kind {other:?} cannot be sent by clients")),
        }
    }

    /// Renders an outbound domain message as a wire envelope.
    #[must_use]
    pub fn outbound(message: &RoomMessage) -> Self {
        match message {
            RoomMessage::BidAccepted { amount } => Self {
                kind: WireKind::BidAccepted,
                message: Some("your bid was successfully placed".to_string()),
                bid_value: Some(*amount),
                user_id: None,
            },
            RoomMessage::BidRejected { reason } => Self {
                kind: WireKind::BidRejected,
                message: Some(reason.clone()),
                bid_value: None,
                user_id: None,
            },
            RoomMessage::HigherBid { amount } => Self {
                kind: WireKind::HigherBid,
                message: Some("a new higher bid was placed".to_string()),
                bid_value: Some(*amount),
                user_id: None,
            },
            RoomMessage::AuctionFinished => Self {
                kind: WireKind::AuctionFinished,
                message: Some("the auction has finished".to_string()),
                bid_value: None,
                user_id: None,
            },
            RoomMessage::InvalidInput { bidder_id, detail } => Self {
                kind: WireKind::InvalidInput,
                message: Some(detail.clone()),
                bid_value: None,
                user_id: Some(*bidder_id),
            },
            RoomMessage::PlaceBid { bidder_id, amount } => Self {
                kind: WireKind::PlaceBid,
                message: None,
                bid_value: Some(*amount),
                user_id: Some(*bidder_id),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&WireKind::HigherBid).unwrap_or_default();
        assert_eq!(json, "\"higher_bid\"");
    }

    #[test]
    fn place_bid_deserializes_and_stamps_bidder() {
        let bidder = Uuid::new_v4();
        let spoofed = Uuid::new_v4();
        let json = format!("{{\"kind\":\"place_bid\",\"bid_value\":150.0,\"user_id\":\"{spoofed}\"}}");

        let Ok(wire) = serde_json::from_str::<WireMessage>(&json) else {
            panic!("deserialization failed");
        };
        let Ok(RoomMessage::PlaceBid { bidder_id, amount }) = wire.into_inbound(bidder) else {
            panic!("expected PlaceBid");
        };
        // The wire user_id is ignored; the pump's identity wins.
        assert_eq!(bidder_id, bidder);
        assert!((amount - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn place_bid_without_value_is_invalid() {
        let wire = WireMessage {
            kind: WireKind::PlaceBid,
            message: None,
            bid_value: None,
            user_id: None,
        };
        assert!(wire.into_inbound(Uuid::new_v4()).is_err());
    }

    #[test]
    fn outbound_only_kinds_are_rejected_inbound() {
        let wire = WireMessage {
            kind: WireKind::AuctionFinished,
            message: None,
            bid_value: None,
            user_id: None,
        };
        assert!(wire.into_inbound(Uuid::new_v4()).is_err());
    }

    #[test]
    fn outbound_omits_absent_fields() {
        let wire = WireMessage::outbound(&RoomMessage::AuctionFinished);
        let json = serde_json::to_string(&wire).unwrap_or_default();
        assert!(json.contains("auction_finished"));
        assert!(!json.contains("bid_value"));
        assert!(!json.contains("user_id"));
    }

    #[test]
    fn higher_bid_carries_amount() {
        let wire = WireMessage::outbound(&RoomMessage::HigherBid { amount: 150.0 });
        assert_eq!(wire.kind, WireKind::HigherBid);
        assert_eq!(wire.bid_value, Some(150.0));
    }
}

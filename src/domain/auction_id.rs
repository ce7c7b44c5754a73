//! Type-safe auction identifier.
//!
//! [`AuctionId`] is a newtype wrapper around [`uuid::Uuid`] (v4) providing
//! type safety so that auction identifiers cannot be confused with bidder
//! or seller UUIDs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for one auction instance.
///
/// Wraps a UUID v4. Assigned once when the auction is opened and immutable
/// thereafter. Used as the dictionary key in [`super::AuctionLobby`] and as
/// the subscription target of the WebSocket endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuctionId(uuid::Uuid);

impl AuctionId {
    /// Creates a new random `AuctionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates an `AuctionId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for AuctionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for AuctionId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<AuctionId> for uuid::Uuid {
    fn from(id: AuctionId) -> Self {
        id.0
    }
}

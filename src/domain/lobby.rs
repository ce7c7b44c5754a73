//! Process-wide registry of running auction rooms.
//!
//! One coarse async mutex over a `HashMap` is deliberate: `open`, `lookup`
//! and `close` are rare compared to in-room traffic, and `lookup` only
//! contends on the registry itself, never on a room's internal state.

use std::collections::HashMap;

use tokio::sync::Mutex;

use super::room::RoomHandle;
use super::AuctionId;

/// A room already exists for this auction identifier.
#[derive(Debug, thiserror::Error)]
#[error("auction {0} already has a running room")]
pub struct DuplicateAuction(pub AuctionId);

/// Mapping from auction identifier to its running room.
///
/// Entries are added when an auction is opened and removed by the room
/// itself at termination; no two rooms can exist for the same identifier.
#[derive(Debug, Default)]
pub struct AuctionLobby {
    rooms: Mutex<HashMap<AuctionId, RoomHandle>>,
}

impl AuctionLobby {
    /// Creates an empty lobby.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a room under its auction identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateAuction`] if a room is already registered for the
    /// same identifier.
    pub async fn open(&self, handle: RoomHandle) -> Result<(), DuplicateAuction> {
        let mut rooms = self.rooms.lock().await;
        let id = handle.auction_id();
        if rooms.contains_key(&id) {
            return Err(DuplicateAuction(id));
        }
        rooms.insert(id, handle);
        Ok(())
    }

    /// Returns the room handle for an auction, if one is running.
    pub async fn lookup(&self, id: AuctionId) -> Option<RoomHandle> {
        self.rooms.lock().await.get(&id).cloned()
    }

    /// Removes a room entry. Called by the room itself at termination;
    /// idempotent.
    pub async fn close(&self, id: AuctionId) {
        self.rooms.lock().await.remove(&id);
    }

    /// Returns the number of running rooms.
    pub async fn len(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Returns `true` if no room is running.
    pub async fn is_empty(&self) -> bool {
        self.rooms.lock().await.is_empty()
    }
}

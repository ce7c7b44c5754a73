//! Domain layer: auction identity, room messages, the per-auction
//! arbitration loop, and the process-wide lobby.
//!
//! The room is the only component that mutates membership, and the lobby's
//! map is the only resource shared across rooms.

pub mod auction_id;
pub mod lobby;
pub mod message;
pub mod room;

pub use auction_id::AuctionId;
pub use lobby::{AuctionLobby, DuplicateAuction};
pub use message::RoomMessage;
pub use room::{AuctionRoom, Participant, RoomClosed, RoomHandle};

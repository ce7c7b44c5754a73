//! WebSocket layer: the subscription endpoint, the wire envelope, and the
//! per-connection pump pair.
//!
//! The endpoint at `/ws/auctions/{id}` bridges one bidder's connection to
//! the auction room's event channels.

pub mod handler;
pub mod messages;
pub mod pump;

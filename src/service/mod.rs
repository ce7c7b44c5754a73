//! Service layer: business logic orchestration.
//!
//! [`AuctionService`] coordinates auction lifecycle: durable records via
//! the ledger, live rooms via the lobby.

pub mod auction_service;

pub use auction_service::AuctionService;

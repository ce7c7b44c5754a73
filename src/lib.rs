//! # gavel-gateway
//!
//! REST API and WebSocket gateway for live, time-boxed auctions.
//!
//! Each open auction is served by exactly one arbitration task (the
//! auction room) that owns membership, serializes bid acceptance against
//! the transactional bid ledger, and fans results out to every connected
//! bidder with bounded, non-blocking delivery.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Subscribe + Connection Pumps (ws/)
//!     │
//!     ├── AuctionService (service/)
//!     ├── AuctionLobby + AuctionRoom (domain/)
//!     │
//!     └── BidLedger: PostgreSQL or in-memory (ledger/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod service;
pub mod ws;

//! Axum WebSocket subscription endpoint.
//!
//! Pre-admission checks (does a live room exist, is the caller
//! authenticated) happen here, before the transport upgrade; the room
//! itself has no rejection path for joins.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::response::IntoResponse;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::pump::run_connection;
use crate::app_state::AppState;
use crate::domain::{AuctionId, Participant};
use crate::error::GatewayError;

/// Bidder identity established by the upstream authentication layer and
/// propagated in the `x-user-id` header. Requests without it are rejected
/// before any room interaction.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedBidder(pub Uuid);

impl<S> FromRequestParts<S> for AuthenticatedBidder
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<Uuid>().ok())
            .map(Self)
            .ok_or(GatewayError::Unauthorized)
    }
}

/// `GET /ws/auctions/{id}` — Subscribe to a live auction.
///
/// Looks up the room first and only then upgrades the transport; a missing
/// room means the auction has finished or never existed.
///
/// # Errors
///
/// Returns [`GatewayError::AuctionNotLive`] when no room is running, or
/// [`GatewayError::Unauthorized`] without a bidder identity.
pub async fn subscribe_handler(
    ws: WebSocketUpgrade,
    Path(id): Path<Uuid>,
    AuthenticatedBidder(bidder_id): AuthenticatedBidder,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    let auction_id = AuctionId::from_uuid(id);
    let Some(room) = state.lobby.lookup(auction_id).await else {
        return Err(GatewayError::AuctionNotLive(id));
    };

    let settings = state.pump_settings;
    Ok(ws.on_upgrade(move |socket| async move {
        let (outbound, outbound_rx) = mpsc::channel(settings.send_queue_capacity);
        let joined = room
            .join(Participant {
                bidder_id,
                outbound,
            })
            .await;
        if joined.is_err() {
            // The room drained between lookup and upgrade; the socket
            // closes when dropped.
            tracing::debug!(%auction_id, %bidder_id, "room closed before join");
            return;
        }
        run_connection(socket, room, bidder_id, outbound_rx, settings).await;
    }))
}

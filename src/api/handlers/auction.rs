//! Auction resource handlers: create, get, bid history, cancel.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{
    AuctionDetailResponse, BidDto, BidListResponse, CreateAuctionRequest, CreateAuctionResponse,
};
use crate::app_state::AppState;
use crate::domain::AuctionId;
use crate::error::{ErrorResponse, GatewayError};
use crate::ledger::models::NewAuction;
use crate::ws::handler::AuthenticatedBidder;

/// `POST /auctions` — List an item and open its live auction room.
///
/// # Errors
///
/// Returns [`GatewayError`] on invalid input or missing seller identity.
#[utoipa::path(
    post,
    path = "/api/v1/auctions",
    tag = "Auctions",
    summary = "Create an auction",
    description = "Persists the auction record and starts the live bidding room, which runs until `ends_at`.",
    request_body = CreateAuctionRequest,
    responses(
        (status = 201, description = "Auction created and room opened", body = CreateAuctionResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing seller identity", body = ErrorResponse),
    )
)]
pub async fn create_auction(
    State(state): State<AppState>,
    AuthenticatedBidder(seller_id): AuthenticatedBidder,
    Json(req): Json<CreateAuctionRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let record = state
        .auction_service
        .create_auction(NewAuction {
            seller_id,
            item_name: req.item_name,
            description: req.description,
            base_price: req.base_price,
            ends_at: req.ends_at,
        })
        .await?;

    let response = CreateAuctionResponse {
        auction_id: *record.id.as_uuid(),
        item_name: record.item_name,
        base_price: record.base_price,
        ends_at: record.ends_at,
        created_at: record.created_at,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// `GET /auctions/{id}` — Auction details plus live status.
///
/// # Errors
///
/// Returns [`GatewayError::AuctionNotFound`] if the auction does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/auctions/{id}",
    tag = "Auctions",
    summary = "Get auction details",
    description = "Returns the auction record and whether its room is still accepting bids.",
    params(
        ("id" = uuid::Uuid, Path, description = "Auction UUID"),
    ),
    responses(
        (status = 200, description = "Auction details", body = AuctionDetailResponse),
        (status = 404, description = "Auction not found", body = ErrorResponse),
    )
)]
pub async fn get_auction(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let (record, live) = state
        .auction_service
        .get_auction(AuctionId::from_uuid(id))
        .await?;

    Ok(Json(AuctionDetailResponse {
        auction_id: *record.id.as_uuid(),
        seller_id: record.seller_id,
        item_name: record.item_name,
        description: record.description,
        base_price: record.base_price,
        ends_at: record.ends_at,
        created_at: record.created_at,
        live,
    }))
}

/// `GET /auctions/{id}/bids` — Accepted bids, highest first.
///
/// # Errors
///
/// Returns [`GatewayError::AuctionNotFound`] if the auction does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/auctions/{id}/bids",
    tag = "Auctions",
    summary = "List accepted bids",
    description = "Returns the accepted bid history for an auction, highest amount first.",
    params(
        ("id" = uuid::Uuid, Path, description = "Auction UUID"),
    ),
    responses(
        (status = 200, description = "Bid history", body = BidListResponse),
        (status = 404, description = "Auction not found", body = ErrorResponse),
    )
)]
pub async fn list_bids(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let bids = state
        .auction_service
        .list_bids(AuctionId::from_uuid(id))
        .await?;

    Ok(Json(BidListResponse {
        data: bids
            .into_iter()
            .map(|bid| BidDto {
                bidder_id: bid.bidder_id,
                amount: bid.amount,
                created_at: bid.created_at,
            })
            .collect(),
    }))
}

/// `DELETE /auctions/{id}` — Cancel a live auction.
///
/// # Errors
///
/// Returns [`GatewayError::AuctionNotLive`] if no room is running.
#[utoipa::path(
    delete,
    path = "/api/v1/auctions/{id}",
    tag = "Auctions",
    summary = "Cancel a live auction",
    description = "Drains the room as if the deadline had fired; every connected bidder receives an auction_finished notice.",
    params(
        ("id" = uuid::Uuid, Path, description = "Auction UUID"),
    ),
    responses(
        (status = 204, description = "Cancel requested"),
        (status = 404, description = "Auction is not live", body = ErrorResponse),
    )
)]
pub async fn cancel_auction(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    state
        .auction_service
        .cancel_auction(AuctionId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Auction resource routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auctions", axum::routing::post(create_auction))
        .route("/auctions/{id}", get(get_auction).delete(cancel_auction))
        .route("/auctions/{id}/bids", get(list_bids))
}

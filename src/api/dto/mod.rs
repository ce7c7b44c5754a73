//! Data Transfer Objects for REST request/response serialization.

pub mod auction_dto;

pub use auction_dto::{
    AuctionDetailResponse, BidDto, BidListResponse, CreateAuctionRequest, CreateAuctionResponse,
};

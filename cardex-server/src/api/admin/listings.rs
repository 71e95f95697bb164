use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use cardex_core::entities::Page;
use cardex_core::entities::listing::ListingFilter;
use cardex_sdk::objects::admin::{ListListingsQuery, clamp_pagination};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::extractors::AdminAuth;
use crate::api::responses::listing_response;
use crate::state::AppState;

/// `GET /listings`: every listing, any status, optionally filtered.
pub(super) async fn list_listings(
    state: State<AppState>,
    AdminAuth(ctx): AdminAuth,
    Query(query): Query<ListListingsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = clamp_pagination(query.limit, query.offset);
    let filter = ListingFilter {
        seller_id: query.seller_id,
        status: query.status.map(Into::into),
    };
    let listings = state
        .engine
        .listings()
        .list(&ctx, filter, Page::new(limit, offset))
        .await?;
    let response: Vec<_> = listings.iter().map(listing_response).collect();
    Ok(Json(response))
}

/// `POST /listings/{listing_id}/expire`: no-op for listings that already
/// left `active`.
pub(super) async fn expire_listing(
    state: State<AppState>,
    AdminAuth(ctx): AdminAuth,
    Path(listing_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = state.engine.listings().expire(&ctx, listing_id).await?;
    Ok(Json(listing_response(&listing)))
}

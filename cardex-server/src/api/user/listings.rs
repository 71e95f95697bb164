use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use cardex_core::entities::Page;
use cardex_core::entities::listing::ListingFilter;
use cardex_sdk::objects::CreateListingRequest;
use cardex_sdk::objects::admin::{ListListingsQuery, clamp_pagination};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::extractors::UserAuth;
use crate::api::responses::listing_response;
use crate::state::AppState;

/// `POST /listings`: offer a card on the marketplace.
pub(super) async fn create_listing(
    state: State<AppState>,
    UserAuth(ctx): UserAuth,
    Json(request): Json<CreateListingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = state.engine.listings().create(&ctx, request).await?;
    Ok((StatusCode::CREATED, Json(listing_response(&listing))))
}

/// `GET /listings`: active listings, newest first.
pub(super) async fn list_active_listings(
    state: State<AppState>,
    _auth: UserAuth,
    Query(query): Query<ListListingsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = clamp_pagination(query.limit, query.offset);
    let listings = state
        .engine
        .listings()
        .list_active(Page::new(limit, offset))
        .await?;
    let response: Vec<_> = listings.iter().map(listing_response).collect();
    Ok(Json(response))
}

/// `GET /listings/mine`: the caller's listings in any status.
pub(super) async fn list_own_listings(
    state: State<AppState>,
    UserAuth(ctx): UserAuth,
    Query(query): Query<ListListingsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = clamp_pagination(query.limit, query.offset);
    let filter = ListingFilter {
        seller_id: None,
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

/// `GET /listings/{listing_id}`
pub(super) async fn get_listing(
    state: State<AppState>,
    _auth: UserAuth,
    Path(listing_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = state.engine.listings().get(listing_id).await?;
    Ok(Json(listing_response(&listing)))
}

/// `POST /listings/{listing_id}/cancel`: seller withdraws an active listing.
pub(super) async fn cancel_listing(
    state: State<AppState>,
    UserAuth(ctx): UserAuth,
    Path(listing_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = state.engine.listings().cancel(&ctx, listing_id).await?;
    Ok(Json(listing_response(&listing)))
}

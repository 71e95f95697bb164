use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use cardex_core::entities::Page;
use cardex_core::entities::trade::TradeFilter;
use cardex_sdk::objects::CodeResponse;
use cardex_sdk::objects::admin::{
    ArbiterNotesRequest, CompleteTradeRequest, ListTradesQuery, ResolveDisputeRequest,
    clamp_pagination,
};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::extractors::AdminAuth;
use crate::api::responses::trade_response;
use crate::state::AppState;

/// `GET /trades`: list trades with pagination and optional filters.
pub(super) async fn list_trades(
    state: State<AppState>,
    AdminAuth(ctx): AdminAuth,
    Query(query): Query<ListTradesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = clamp_pagination(query.limit, query.offset);
    let filter = TradeFilter {
        party_id: None,
        listing_id: query.listing_id,
        status: query.status.map(Into::into),
    };
    let trades = state
        .engine
        .trades()
        .list(&ctx, filter, Page::new(limit, offset))
        .await?;
    let response: Vec<_> = trades.iter().map(trade_response).collect();
    Ok(Json(response))
}

/// `GET /trades/{trade_id}`
pub(super) async fn get_trade(
    state: State<AppState>,
    AdminAuth(ctx): AdminAuth,
    Path(trade_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let trade = state.engine.trades().get(&ctx, trade_id).await?;
    Ok(Json(trade_response(&trade)))
}

/// `POST /trades/{trade_id}/complete`: paid → completed, storing the code.
pub(super) async fn complete_trade(
    state: State<AppState>,
    AdminAuth(ctx): AdminAuth,
    Path(trade_id): Path<Uuid>,
    Json(request): Json<CompleteTradeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let trade = state
        .engine
        .trades()
        .complete(&ctx, trade_id, &request.code, request.notes.as_deref())
        .await?;
    Ok(Json(trade_response(&trade)))
}

/// `POST /trades/{trade_id}/dispute`
pub(super) async fn dispute_trade(
    state: State<AppState>,
    AdminAuth(ctx): AdminAuth,
    Path(trade_id): Path<Uuid>,
    Json(request): Json<ArbiterNotesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let trade = state
        .engine
        .trades()
        .dispute(&ctx, trade_id, request.notes.as_deref())
        .await?;
    Ok(Json(trade_response(&trade)))
}

/// `POST /trades/{trade_id}/cancel`: the listing stays sold.
pub(super) async fn cancel_trade(
    state: State<AppState>,
    AdminAuth(ctx): AdminAuth,
    Path(trade_id): Path<Uuid>,
    Json(request): Json<ArbiterNotesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let trade = state
        .engine
        .trades()
        .cancel(&ctx, trade_id, request.notes.as_deref())
        .await?;
    Ok(Json(trade_response(&trade)))
}

/// `POST /trades/{trade_id}/resolve`: `{"outcome":"release","code":…}` or
/// `{"outcome":"refund"}`.
pub(super) async fn resolve_dispute(
    state: State<AppState>,
    AdminAuth(ctx): AdminAuth,
    Path(trade_id): Path<Uuid>,
    Json(request): Json<ResolveDisputeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let trade = state
        .engine
        .trades()
        .resolve_dispute(&ctx, trade_id, request.resolution, request.notes.as_deref())
        .await?;
    Ok(Json(trade_response(&trade)))
}

/// `GET /trades/{trade_id}/code`
pub(super) async fn read_code(
    state: State<AppState>,
    AdminAuth(ctx): AdminAuth,
    Path(trade_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let code = state.engine.trades().read_code(&ctx, trade_id).await?;
    Ok(Json(CodeResponse { code }))
}

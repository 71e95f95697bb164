use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use cardex_core::engine::EngineError;
use cardex_core::entities::Page;
use cardex_core::entities::trade::TradeFilter;
use cardex_sdk::objects::admin::{ListTradesQuery, clamp_pagination};
use cardex_sdk::objects::{CodeResponse, InitiateTradeRequest, SubmitPaymentProofRequest};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::extractors::UserAuth;
use crate::api::responses::trade_response;
use crate::state::AppState;

/// `POST /listings/{listing_id}/trades`: claim an active listing.
///
/// Exactly one caller wins a listing; the others get `409 Conflict`. The
/// body is optional.
pub(super) async fn initiate_trade(
    state: State<AppState>,
    UserAuth(ctx): UserAuth,
    Path(listing_id): Path<Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request = if body.is_empty() {
        InitiateTradeRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| EngineError::invalid_input(format!("invalid JSON body: {e}")))?
    };
    let trade = state
        .engine
        .trades()
        .initiate(&ctx, listing_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(trade_response(&trade))))
}

/// `GET /trades`: trades the caller is a party to.
pub(super) async fn list_trades(
    state: State<AppState>,
    UserAuth(ctx): UserAuth,
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
    UserAuth(ctx): UserAuth,
    Path(trade_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let trade = state.engine.trades().get(&ctx, trade_id).await?;
    Ok(Json(trade_response(&trade)))
}

/// `POST /trades/{trade_id}/payment-proof`: pending → paid, buyer only.
pub(super) async fn submit_payment_proof(
    state: State<AppState>,
    UserAuth(ctx): UserAuth,
    Path(trade_id): Path<Uuid>,
    Json(request): Json<SubmitPaymentProofRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let trade = state
        .engine
        .trades()
        .submit_payment_proof(&ctx, trade_id, &request.proof_ref)
        .await?;
    Ok(Json(trade_response(&trade)))
}

/// `GET /trades/{trade_id}/code`: only for the buyer of a completed trade.
pub(super) async fn read_code(
    state: State<AppState>,
    UserAuth(ctx): UserAuth,
    Path(trade_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let code = state.engine.trades().read_code(&ctx, trade_id).await?;
    Ok(Json(CodeResponse { code }))
}

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use cardex_core::entities::Page;
use cardex_core::entities::transaction::TransactionFilter;
use cardex_sdk::objects::admin::{ListOrdersQuery, clamp_pagination};
use cardex_sdk::objects::{CodeResponse, CreateBuyOrderRequest, CreateSellOrderRequest};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::extractors::UserAuth;
use crate::api::responses::transaction_response;
use crate::state::AppState;

/// `POST /orders/buy`: quote and record a pending buy order.
pub(super) async fn create_buy_order(
    state: State<AppState>,
    UserAuth(ctx): UserAuth,
    Json(request): Json<CreateBuyOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.engine.orders().create_buy_order(&ctx, request).await?;
    Ok((StatusCode::CREATED, Json(transaction_response(&record))))
}

/// `POST /orders/sell`: quote and record a pending sell order.
///
/// The submitted code is stored for the arbiter and never echoed back.
pub(super) async fn create_sell_order(
    state: State<AppState>,
    UserAuth(ctx): UserAuth,
    Json(request): Json<CreateSellOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.engine.orders().create_sell_order(&ctx, request).await?;
    Ok((StatusCode::CREATED, Json(transaction_response(&record))))
}

/// `GET /orders`: the caller's orders, newest first.
pub(super) async fn list_orders(
    state: State<AppState>,
    UserAuth(ctx): UserAuth,
    Query(query): Query<ListOrdersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = clamp_pagination(query.limit, query.offset);
    let filter = TransactionFilter {
        user_id: None,
        status: query.status.map(Into::into),
        direction: query.direction.map(Into::into),
    };

    let records = state
        .engine
        .orders()
        .list(&ctx, filter, Page::new(limit, offset))
        .await?;
    let response: Vec<_> = records.iter().map(transaction_response).collect();
    Ok(Json(response))
}

/// `GET /orders/{order_id}`
pub(super) async fn get_order(
    state: State<AppState>,
    UserAuth(ctx): UserAuth,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.engine.orders().get(&ctx, order_id).await?;
    Ok(Json(transaction_response(&record)))
}

/// `GET /orders/{order_id}/code`: only for the owner of a completed buy order.
pub(super) async fn read_code(
    state: State<AppState>,
    UserAuth(ctx): UserAuth,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let code = state.engine.orders().read_code(&ctx, order_id).await?;
    Ok(Json(CodeResponse { code }))
}

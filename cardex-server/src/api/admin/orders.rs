use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use cardex_core::entities::Page;
use cardex_core::entities::transaction::TransactionFilter;
use cardex_sdk::objects::CodeResponse;
use cardex_sdk::objects::admin::{AttachCodeRequest, ListOrdersQuery, clamp_pagination};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::extractors::AdminAuth;
use crate::api::responses::transaction_response;
use crate::state::AppState;

/// `GET /orders`: list orders with pagination and optional filters.
pub(super) async fn list_orders(
    state: State<AppState>,
    AdminAuth(ctx): AdminAuth,
    Query(query): Query<ListOrdersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = clamp_pagination(query.limit, query.offset);
    let filter = TransactionFilter {
        user_id: query.user_id,
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
    AdminAuth(ctx): AdminAuth,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.engine.orders().get(&ctx, order_id).await?;
    Ok(Json(transaction_response(&record)))
}

/// `POST /orders/{order_id}/approve`: buy orders need a code attached first.
pub(super) async fn approve_order(
    state: State<AppState>,
    AdminAuth(ctx): AdminAuth,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.engine.orders().approve(&ctx, order_id).await?;
    Ok(Json(transaction_response(&record)))
}

/// `POST /orders/{order_id}/reject`
pub(super) async fn reject_order(
    state: State<AppState>,
    AdminAuth(ctx): AdminAuth,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.engine.orders().reject(&ctx, order_id).await?;
    Ok(Json(transaction_response(&record)))
}

/// `POST /orders/{order_id}/code`: attach (or replace) the code of a
/// pending buy order.
pub(super) async fn attach_code(
    state: State<AppState>,
    AdminAuth(ctx): AdminAuth,
    Path(order_id): Path<Uuid>,
    Json(request): Json<AttachCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .engine
        .orders()
        .attach_code(&ctx, order_id, &request.code)
        .await?;
    Ok(Json(transaction_response(&record)))
}

/// `GET /orders/{order_id}/code`
pub(super) async fn read_code(
    state: State<AppState>,
    AdminAuth(ctx): AdminAuth,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let code = state.engine.orders().read_code(&ctx, order_id).await?;
    Ok(Json(CodeResponse { code }))
}

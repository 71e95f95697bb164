use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use cardex_sdk::objects::RateQuery;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::extractors::UserAuth;
use crate::api::responses::rate_response;
use crate::state::AppState;

/// `GET /cards/{card_id}/rate?country=`: effective buy and sell rates.
///
/// Uses the country override when one exists, the card default otherwise.
pub(super) async fn get_rate(
    state: State<AppState>,
    _auth: UserAuth,
    Path(card_id): Path<Uuid>,
    Query(query): Query<RateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let resolved = state
        .engine
        .rates()
        .resolve(card_id, query.country.as_deref())
        .await?;
    Ok(Json(rate_response(&resolved)))
}

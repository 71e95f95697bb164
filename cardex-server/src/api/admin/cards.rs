use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use cardex_core::engine::{EngineError, Rate};
use cardex_core::store::CardUpsert;
use cardex_sdk::objects::admin::{CountryRateRequest, UpsertCardRequest};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::extractors::AdminAuth;
use crate::api::responses::{card_response, country_rate_response};
use crate::state::AppState;

/// `PUT /cards/{card_id}`: create or update a card. Deactivating a card
/// stops new orders for it; existing orders are unaffected.
pub(super) async fn upsert_card(
    state: State<AppState>,
    AdminAuth(ctx): AdminAuth,
    Path(card_id): Path<Uuid>,
    Json(request): Json<UpsertCardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let card = state
        .engine
        .rates()
        .upsert_card(
            &ctx,
            CardUpsert {
                card_id,
                name: request.name,
                active: request.active,
                buy_rate: request.buy_rate,
                sell_rate: request.sell_rate,
            },
        )
        .await?;
    Ok(Json(card_response(&card)))
}

/// `PUT /cards/{card_id}/rates/{country}`
pub(super) async fn set_country_rate(
    state: State<AppState>,
    AdminAuth(ctx): AdminAuth,
    Path((card_id, country)): Path<(Uuid, String)>,
    Json(request): Json<CountryRateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let rate = Rate::new(request.buy_rate, request.sell_rate)?;
    let stored = state
        .engine
        .rates()
        .set_country_rate(&ctx, card_id, &country, rate)
        .await?;
    Ok(Json(country_rate_response(&stored)))
}

/// `DELETE /cards/{card_id}/rates/{country}`: the card default applies again.
pub(super) async fn remove_country_rate(
    state: State<AppState>,
    AdminAuth(ctx): AdminAuth,
    Path((card_id, country)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .engine
        .rates()
        .remove_country_rate(&ctx, card_id, &country)
        .await?;
    if !removed {
        return Err(EngineError::NotFound {
            entity: "country rate",
            id: card_id,
        }
        .into());
    }
    Ok(StatusCode::NO_CONTENT)
}

//! Admin API handlers.
//!
//! These endpoints are called by the arbiter dashboard and require the
//! `Cardex-Admin-Authorization` header with the plaintext admin secret plus
//! `Cardex-Admin-Id`.
//!
//! # Endpoints
//!
//! - `PUT    /cards/{card_id}`                   – create or update a card and its default rates
//! - `PUT    /cards/{card_id}/rates/{country}`   – set a country override
//! - `DELETE /cards/{card_id}/rates/{country}`   – remove a country override
//! - `GET    /orders`                            – list orders (paginated, filterable)
//! - `GET    /orders/{order_id}`                 – one order
//! - `POST   /orders/{order_id}/approve`         – pending → completed
//! - `POST   /orders/{order_id}/reject`          – pending → cancelled
//! - `POST   /orders/{order_id}/code`            – attach a code to a pending buy order
//! - `GET    /orders/{order_id}/code`            – read an order's code
//! - `GET    /listings`                          – list listings (paginated, filterable)
//! - `POST   /listings/{listing_id}/expire`      – active → expired
//! - `GET    /trades`                            – list trades (paginated, filterable)
//! - `GET    /trades/{trade_id}`                 – one trade
//! - `POST   /trades/{trade_id}/complete`        – paid → completed with the code
//! - `POST   /trades/{trade_id}/dispute`         – pending/paid → disputed
//! - `POST   /trades/{trade_id}/cancel`          – pending/paid → cancelled
//! - `POST   /trades/{trade_id}/resolve`         – disputed → completed or cancelled
//! - `GET    /trades/{trade_id}/code`            – read a trade's code

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

mod cards;
mod listings;
mod orders;
mod trades;

/// Build the Admin API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cards/{card_id}", put(cards::upsert_card))
        .route(
            "/cards/{card_id}/rates/{country}",
            put(cards::set_country_rate).delete(cards::remove_country_rate),
        )
        .route("/orders", get(orders::list_orders))
        .route("/orders/{order_id}", get(orders::get_order))
        .route("/orders/{order_id}/approve", post(orders::approve_order))
        .route("/orders/{order_id}/reject", post(orders::reject_order))
        .route(
            "/orders/{order_id}/code",
            get(orders::read_code).post(orders::attach_code),
        )
        .route("/listings", get(listings::list_listings))
        .route(
            "/listings/{listing_id}/expire",
            post(listings::expire_listing),
        )
        .route("/trades", get(trades::list_trades))
        .route("/trades/{trade_id}", get(trades::get_trade))
        .route("/trades/{trade_id}/complete", post(trades::complete_trade))
        .route("/trades/{trade_id}/dispute", post(trades::dispute_trade))
        .route("/trades/{trade_id}/cancel", post(trades::cancel_trade))
        .route("/trades/{trade_id}/resolve", post(trades::resolve_dispute))
        .route("/trades/{trade_id}/code", get(trades::read_code))
}

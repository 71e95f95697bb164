//! User API handlers.
//!
//! These endpoints are called on behalf of end users by the identity gateway
//! and require the `Cardex-User-Id` and `Cardex-Signature` headers.
//!
//! # Endpoints
//!
//! - `GET  /cards/{card_id}/rate`              – effective rate for a country
//! - `POST /orders/buy`                        – place a buy order
//! - `POST /orders/sell`                       – place a sell order
//! - `GET  /orders`                            – own orders
//! - `GET  /orders/{order_id}`                 – one own order
//! - `GET  /orders/{order_id}/code`            – redemption code of a completed buy order
//! - `POST /listings`                          – create a listing
//! - `GET  /listings`                          – active listings
//! - `GET  /listings/mine`                     – own listings in any status
//! - `GET  /listings/{listing_id}`             – one listing
//! - `POST /listings/{listing_id}/cancel`      – cancel own listing
//! - `POST /listings/{listing_id}/trades`      – buy a listing
//! - `GET  /trades`                            – trades the user is a party to
//! - `GET  /trades/{trade_id}`                 – one trade
//! - `POST /trades/{trade_id}/payment-proof`   – buyer submits payment proof
//! - `GET  /trades/{trade_id}/code`            – redemption code of a completed trade
//! - `GET  /events/ws`                         – WebSocket stream of own events

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

mod listings;
mod orders;
mod rates;
mod trades;
mod ws;

/// Build the User API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cards/{card_id}/rate", get(rates::get_rate))
        .route("/orders", get(orders::list_orders))
        .route("/orders/buy", post(orders::create_buy_order))
        .route("/orders/sell", post(orders::create_sell_order))
        .route("/orders/{order_id}", get(orders::get_order))
        .route("/orders/{order_id}/code", get(orders::read_code))
        .route(
            "/listings",
            get(listings::list_active_listings).post(listings::create_listing),
        )
        .route("/listings/mine", get(listings::list_own_listings))
        .route("/listings/{listing_id}", get(listings::get_listing))
        .route(
            "/listings/{listing_id}/cancel",
            post(listings::cancel_listing),
        )
        .route(
            "/listings/{listing_id}/trades",
            post(trades::initiate_trade),
        )
        .route("/trades", get(trades::list_trades))
        .route("/trades/{trade_id}", get(trades::get_trade))
        .route(
            "/trades/{trade_id}/payment-proof",
            post(trades::submit_payment_proof),
        )
        .route("/trades/{trade_id}/code", get(trades::read_code))
        .route("/events/ws", get(ws::events_ws))
}


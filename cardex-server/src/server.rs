//! Axum server setup and router configuration.

use crate::api;
use crate::shutdown::shutdown_signal;
use crate::state::AppState;
use axum::{Json, Router, response::IntoResponse, routing::get};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Build the main application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .nest("/api/user", api::user::router())
        .nest("/api/admin", api::admin::router())
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Simple health check - returns OK if the server is running.
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Run the server with graceful shutdown support.
///
/// On SIGTERM/SIGINT, `shutdown_tx` is set to `true` before in-flight
/// connections are drained, so WebSocket streams and background processors
/// stop alongside the listener.
pub async fn run_server(
    router: Router,
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::runtime::{AdminConfig, IdentityConfig, NotificationConfig, SharedConfig};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use cardex_core::config::ConfigStore;
    use cardex_core::engine::SettlementEngine;
    use cardex_core::events::{EventPublisher, SettlementEventReceiver, settlement_event_channel};
    use cardex_core::store::MemoryStore;
    use cardex_sdk::objects::{
        CodeResponse, ErrorKind, ErrorResponse, ListingResponse, RateResponse, TradeResponse,
        TradeStatus, TransactionResponse, TransactionStatus,
    };
    use cardex_sdk::signature::{
        ADMIN_AUTH_HEADER, ADMIN_ID_HEADER, SIGNATURE_HEADER, USER_ID_HEADER, sign_identity,
    };
    use rust_decimal_macros::dec;
    use serde::de::DeserializeOwned;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    const IDENTITY_SECRET: &[u8] = b"gateway-secret";
    const ADMIN_SECRET: &str = "arbiter-pass";

    struct TestApp {
        router: Router,
        admin_id: Uuid,
        _events: SettlementEventReceiver,
        _shutdown: watch::Sender<bool>,
    }

    enum Caller {
        User(Uuid),
        Admin(Uuid),
        Anonymous,
    }

    impl TestApp {
        fn new() -> Self {
            let (event_tx, events) = settlement_event_channel();
            let engine =
                SettlementEngine::new(Arc::new(MemoryStore::new()), EventPublisher::new(event_tx));
            let admin = AdminConfig::new(AdminConfig::hash_secret(ADMIN_SECRET).unwrap());
            let identity = IdentityConfig::new(IDENTITY_SECRET.to_vec());
            let (shutdown, shutdown_rx) = watch::channel(false);
            let state = AppState::new(
                engine,
                SharedConfig::new(admin, identity),
                ConfigStore::new(NotificationConfig::default()),
                shutdown_rx,
            );
            Self {
                router: build_router(state),
                admin_id: Uuid::now_v7(),
                _events: events,
                _shutdown: shutdown,
            }
        }

        fn admin(&self) -> Caller {
            Caller::Admin(self.admin_id)
        }

        async fn call(
            &self,
            caller: Caller,
            method: Method,
            uri: &str,
            body: Option<Value>,
        ) -> (StatusCode, Vec<u8>) {
            let mut builder = Request::builder().method(method).uri(uri);
            match caller {
                Caller::User(user_id) => {
                    builder = builder
                        .header(USER_ID_HEADER, user_id.to_string())
                        .header(SIGNATURE_HEADER, sign_identity(user_id, IDENTITY_SECRET));
                }
                Caller::Admin(admin_id) => {
                    builder = builder
                        .header(ADMIN_AUTH_HEADER, ADMIN_SECRET)
                        .header(ADMIN_ID_HEADER, admin_id.to_string());
                }
                Caller::Anonymous => {}
            }
            let request = match body {
                Some(body) => builder
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, bytes.to_vec())
        }

        async fn json<T: DeserializeOwned>(
            &self,
            caller: Caller,
            method: Method,
            uri: &str,
            body: Option<Value>,
            expected: StatusCode,
        ) -> T {
            let (status, bytes) = self.call(caller, method, uri, body).await;
            assert_eq!(
                status,
                expected,
                "{uri}: {}",
                String::from_utf8_lossy(&bytes)
            );
            serde_json::from_slice(&bytes).unwrap()
        }

        async fn card(&self, buy_rate: &str, sell_rate: &str) -> Uuid {
            let card_id = Uuid::now_v7();
            let _: Value = self
                .json(
                    self.admin(),
                    Method::PUT,
                    &format!("/api/admin/cards/{card_id}"),
                    Some(json!({"name": "Amazon", "buy_rate": buy_rate, "sell_rate": sell_rate})),
                    StatusCode::OK,
                )
                .await;
            card_id
        }
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = TestApp::new();
        let (status, _) = app.call(Caller::Anonymous, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn user_routes_require_a_valid_signature() {
        let app = TestApp::new();
        let (status, _) = app
            .call(Caller::Anonymous, Method::GET, "/api/user/orders", None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let user_id = Uuid::now_v7();
        let request = Request::builder()
            .uri("/api/user/orders")
            .header(USER_ID_HEADER, user_id.to_string())
            .header(SIGNATURE_HEADER, sign_identity(user_id, b"wrong-secret"))
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_routes_reject_wrong_secret_and_users() {
        let app = TestApp::new();
        let request = Request::builder()
            .uri("/api/admin/orders")
            .header(ADMIN_AUTH_HEADER, "guess")
            .header(ADMIN_ID_HEADER, Uuid::now_v7().to_string())
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .call(Caller::User(Uuid::now_v7()), Method::GET, "/api/admin/orders", None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn country_override_takes_precedence() {
        let app = TestApp::new();
        let card_id = app.card("0.85", "0.47").await;
        let _: Value = app
            .json(
                app.admin(),
                Method::PUT,
                &format!("/api/admin/cards/{card_id}/rates/ng"),
                Some(json!({"buy_rate": "0.90", "sell_rate": "0.50"})),
                StatusCode::OK,
            )
            .await;

        let user = Uuid::now_v7();
        let rate: RateResponse = app
            .json(
                Caller::User(user),
                Method::GET,
                &format!("/api/user/cards/{card_id}/rate?country=NG"),
                None,
                StatusCode::OK,
            )
            .await;
        assert!(rate.is_override);
        assert_eq!(rate.buy_rate, dec!(0.90));

        let default: RateResponse = app
            .json(
                Caller::User(user),
                Method::GET,
                &format!("/api/user/cards/{card_id}/rate"),
                None,
                StatusCode::OK,
            )
            .await;
        assert!(!default.is_override);
        assert_eq!(default.sell_rate, dec!(0.47));

        let (status, _) = app
            .call(
                app.admin(),
                Method::DELETE,
                &format!("/api/admin/cards/{card_id}/rates/NG"),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app
            .call(
                app.admin(),
                Method::DELETE,
                &format!("/api/admin/cards/{card_id}/rates/NG"),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn buy_order_needs_a_code_before_approval() {
        let app = TestApp::new();
        let card_id = app.card("0.85", "0.47").await;
        let user = Uuid::now_v7();

        let order: TransactionResponse = app
            .json(
                Caller::User(user),
                Method::POST,
                "/api/user/orders/buy",
                Some(json!({"card_id": card_id, "face_value": "100", "quantity": 2})),
                StatusCode::CREATED,
            )
            .await;
        assert_eq!(order.quoted_price, dec!(170.00));
        assert_eq!(order.status, TransactionStatus::Pending);
        let id = order.transaction_id;

        let err: ErrorResponse = app
            .json(
                app.admin(),
                Method::POST,
                &format!("/api/admin/orders/{id}/approve"),
                None,
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .await;
        assert_eq!(err.error, ErrorKind::MissingCode);

        let _: TransactionResponse = app
            .json(
                app.admin(),
                Method::POST,
                &format!("/api/admin/orders/{id}/code"),
                Some(json!({"code": "AMZN-1234"})),
                StatusCode::OK,
            )
            .await;

        // Still pending, so the owner cannot read it yet.
        let (status, _) = app
            .call(
                Caller::User(user),
                Method::GET,
                &format!("/api/user/orders/{id}/code"),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let approved: TransactionResponse = app
            .json(
                app.admin(),
                Method::POST,
                &format!("/api/admin/orders/{id}/approve"),
                None,
                StatusCode::OK,
            )
            .await;
        assert_eq!(approved.status, TransactionStatus::Completed);

        let code: CodeResponse = app
            .json(
                Caller::User(user),
                Method::GET,
                &format!("/api/user/orders/{id}/code"),
                None,
                StatusCode::OK,
            )
            .await;
        assert_eq!(code.code, "AMZN-1234");

        // Another user cannot even see the order.
        let (status, _) = app
            .call(
                Caller::User(Uuid::now_v7()),
                Method::GET,
                &format!("/api/user/orders/{id}"),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn sell_order_payout_and_rejection() {
        let app = TestApp::new();
        let card_id = app.card("0.85", "0.47").await;
        let seller = Uuid::now_v7();

        let order: TransactionResponse = app
            .json(
                Caller::User(seller),
                Method::POST,
                "/api/user/orders/sell",
                Some(json!({
                    "card_id": card_id,
                    "face_value": "100",
                    "quantity": 1,
                    "code": "SELL-1",
                    "payment_method": "bank",
                    "payment_details": "IBAN 123"
                })),
                StatusCode::CREATED,
            )
            .await;
        assert_eq!(order.quoted_price, dec!(47.00));
        assert!(order.code.is_none());

        let rejected: TransactionResponse = app
            .json(
                app.admin(),
                Method::POST,
                &format!("/api/admin/orders/{}/reject", order.transaction_id),
                None,
                StatusCode::OK,
            )
            .await;
        assert_eq!(rejected.status, TransactionStatus::Cancelled);

        let err: ErrorResponse = app
            .json(
                app.admin(),
                Method::POST,
                &format!("/api/admin/orders/{}/approve", order.transaction_id),
                None,
                StatusCode::CONFLICT,
            )
            .await;
        assert_eq!(err.error, ErrorKind::InvalidTransition);
        assert_eq!(err.current_status.as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn marketplace_trade_end_to_end() {
        let app = TestApp::new();
        let (seller, buyer) = (Uuid::now_v7(), Uuid::now_v7());

        let listing: ListingResponse = app
            .json(
                Caller::User(seller),
                Method::POST,
                "/api/user/listings",
                Some(json!({
                    "card_name": "Steam Wallet",
                    "amount": "50",
                    "price": "42.50",
                    "currency": "usd"
                })),
                StatusCode::CREATED,
            )
            .await;
        assert_eq!(listing.currency, "USD");

        let active: Vec<ListingResponse> = app
            .json(
                Caller::User(buyer),
                Method::GET,
                "/api/user/listings",
                None,
                StatusCode::OK,
            )
            .await;
        assert_eq!(active.len(), 1);

        let trades_uri = format!("/api/user/listings/{}/trades", listing.listing_id);
        let trade: TradeResponse = app
            .json(
                Caller::User(buyer),
                Method::POST,
                &trades_uri,
                None,
                StatusCode::CREATED,
            )
            .await;
        assert_eq!(trade.status, TradeStatus::Pending);

        let err: ErrorResponse = app
            .json(
                Caller::User(Uuid::now_v7()),
                Method::POST,
                &trades_uri,
                Some(json!({"payment_method": "paypal"})),
                StatusCode::CONFLICT,
            )
            .await;
        assert_eq!(err.error, ErrorKind::Conflict);

        let id = trade.trade_id;
        let _: TradeResponse = app
            .json(
                Caller::User(buyer),
                Method::POST,
                &format!("/api/user/trades/{id}/payment-proof"),
                Some(json!({"proof_ref": "s3://proofs/1.png"})),
                StatusCode::OK,
            )
            .await;

        let completed: TradeResponse = app
            .json(
                app.admin(),
                Method::POST,
                &format!("/api/admin/trades/{id}/complete"),
                Some(json!({"code": "STEAM-42"})),
                StatusCode::OK,
            )
            .await;
        assert_eq!(completed.status, TradeStatus::Completed);

        let code: CodeResponse = app
            .json(
                Caller::User(buyer),
                Method::GET,
                &format!("/api/user/trades/{id}/code"),
                None,
                StatusCode::OK,
            )
            .await;
        assert_eq!(code.code, "STEAM-42");

        let (status, _) = app
            .call(
                Caller::User(seller),
                Method::GET,
                &format!("/api/user/trades/{id}/code"),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let seller_view: TradeResponse = app
            .json(
                Caller::User(seller),
                Method::GET,
                &format!("/api/user/trades/{id}"),
                None,
                StatusCode::OK,
            )
            .await;
        assert!(seller_view.code.is_none());
    }

    #[tokio::test]
    async fn disputed_trade_can_be_refunded_but_not_completed() {
        let app = TestApp::new();
        let (seller, buyer) = (Uuid::now_v7(), Uuid::now_v7());
        let listing: ListingResponse = app
            .json(
                Caller::User(seller),
                Method::POST,
                "/api/user/listings",
                Some(json!({"card_name": "iTunes", "amount": "25", "price": "20", "currency": "GBP"})),
                StatusCode::CREATED,
            )
            .await;
        let trade: TradeResponse = app
            .json(
                Caller::User(buyer),
                Method::POST,
                &format!("/api/user/listings/{}/trades", listing.listing_id),
                None,
                StatusCode::CREATED,
            )
            .await;
        let id = trade.trade_id;

        let disputed: TradeResponse = app
            .json(
                app.admin(),
                Method::POST,
                &format!("/api/admin/trades/{id}/dispute"),
                Some(json!({"notes": "seller unresponsive"})),
                StatusCode::OK,
            )
            .await;
        assert_eq!(disputed.status, TradeStatus::Disputed);

        let refunded: TradeResponse = app
            .json(
                app.admin(),
                Method::POST,
                &format!("/api/admin/trades/{id}/resolve"),
                Some(json!({"outcome": "refund"})),
                StatusCode::OK,
            )
            .await;
        assert_eq!(refunded.status, TradeStatus::Cancelled);

        let err: ErrorResponse = app
            .json(
                app.admin(),
                Method::POST,
                &format!("/api/admin/trades/{id}/complete"),
                Some(json!({"code": "LATE"})),
                StatusCode::CONFLICT,
            )
            .await;
        assert_eq!(err.current_status.as_deref(), Some("cancelled"));
    }
}

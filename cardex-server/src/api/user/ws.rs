use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use cardex_core::events::SettlementEvent;
use cardex_sdk::objects::ws::{WsCloseCode, WsServerMessage};
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use uuid::Uuid;

use crate::api::extractors::UserAuth;
use crate::state::AppState;

/// `GET /events/ws`: WebSocket stream of the caller's settlement events.
///
/// Pushes a [`WsServerMessage::Event`] frame for every committed transition
/// that involves the authenticated user. Frames carry identifiers and
/// statuses only; clients re-read records over REST.
pub(super) async fn events_ws(
    state: State<AppState>,
    UserAuth(ctx): UserAuth,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let app_state = state.0.clone();
    let user_id = ctx.actor();
    ws.on_upgrade(move |socket| handle_events_ws(socket, app_state, user_id))
}

/// Background task that drives a single WebSocket connection.
///
/// Forwards matching events until the client disconnects, the feed closes,
/// or the server shuts down. A lagging receiver is told how many events it
/// missed and keeps going.
async fn handle_events_ws(mut socket: WebSocket, state: AppState, user_id: Uuid) {
    let mut feed = BroadcastStream::new(state.engine.events().subscribe());
    let mut shutdown_rx = state.shutdown.clone();
    tracing::debug!(%user_id, "WS: event stream opened");

    loop {
        tokio::select! {
            item = feed.next() => {
                let msg = match item {
                    Some(Ok(event)) => match frame_for(&event, user_id) {
                        Some(msg) => msg,
                        None => continue,
                    },
                    Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                        tracing::warn!(%user_id, skipped, "WS: event feed lagged");
                        WsServerMessage::Lagged { skipped }
                    }
                    None => {
                        close(&mut socket, WsCloseCode::GOING_AWAY, "event feed closed").await;
                        return;
                    }
                };
                if send_json(&mut socket, &msg).await.is_err() {
                    return;
                }
            }

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    close(&mut socket, WsCloseCode::GOING_AWAY, "server shutting down").await;
                    return;
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        tracing::debug!(%user_id, "WS: client disconnected");
                        return;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

/// The frame for `user_id`, if the event concerns them.
fn frame_for(event: &SettlementEvent, user_id: Uuid) -> Option<WsServerMessage> {
    event.involves(user_id).then(|| WsServerMessage::Event {
        notification: event.payload_for(user_id),
    })
}

async fn close(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
}

/// Serialize `value` as JSON and send it as a text WebSocket frame.
///
/// Returns `Err(())` if the send fails (client disconnected).
async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), ()> {
    let json = serde_json::to_string(value).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardex_sdk::objects::{NotificationKind, NotificationSubject};

    #[test]
    fn only_parties_receive_frames() {
        let (buyer, seller, stranger) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
        let event = SettlementEvent::new(
            NotificationKind::TradePaid,
            NotificationSubject::Trade(Uuid::now_v7()),
            "paid",
            [buyer, seller],
        );

        assert!(frame_for(&event, stranger).is_none());
        match frame_for(&event, seller) {
            Some(WsServerMessage::Event { notification }) => {
                assert_eq!(notification.recipient, seller);
                assert_eq!(notification.kind, NotificationKind::TradePaid);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

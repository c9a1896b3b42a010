//! axum bridge between client sockets and the subscription hub.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::{Sink, SinkExt, StreamExt};
use tracing::{debug, warn};

use crate::hub::SubscriptionHub;
use crate::message::ServerMessage;

/// Router exposing the hub at `/ws`.
pub fn ws_router(hub: Arc<SubscriptionHub>) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(hub)
}

async fn ws_handler(State(hub): State<Arc<SubscriptionHub>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, hub))
}

/// Drive one client socket until either side closes.
pub async fn serve_socket(socket: WebSocket, hub: Arc<SubscriptionHub>) {
    let (mut sender, mut receiver) = socket.split();

    let Some((id, mut outbound)) = hub.register() else {
        let _ = send_json(&mut sender, &ServerMessage::error("Too many connections")).await;
        let _ = sender.send(Message::Close(None)).await;
        return;
    };

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let reply = hub.handle_text(id, text.as_str()).await;
                    if send_json(&mut sender, &reply).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!(connection = id, "Client closed connection");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(connection = id, error = %e, "Client socket error");
                    break;
                }
            },
            event = outbound.recv() => match event {
                Some(event) => {
                    if send_json(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    hub.unregister(id);
}

async fn send_json<S>(sender: &mut S, msg: &ServerMessage) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            warn!(error = %e, "Failed to serialize WS message");
            Ok(())
        }
    }
}

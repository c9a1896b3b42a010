//! Upstream relay against a fake orderbook stream.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use premia_orderbook::MockOrderbook;
use premia_ws::{
    Channel, ClientMessage, FilterBody, HubConfig, RelayConfig, ServerMessage, SubscriptionHub,
    UpstreamRelay,
};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

async fn read_handshake(ws: &mut WebSocketStream<TcpStream>) -> Vec<ClientMessage> {
    let mut frames = Vec::new();
    while frames.len() < 3 {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => frames.push(serde_json::from_str(&text).unwrap()),
            Some(Ok(_)) => {}
            other => panic!("unexpected frame: {other:?}"),
        }
    }
    frames
}

async fn subscribed_client(
    hub: &SubscriptionHub,
) -> tokio::sync::mpsc::Receiver<ServerMessage> {
    let (id, rx) = hub.register().unwrap();
    hub.handle_message(
        id,
        ClientMessage::Auth {
            api_key: "client".to_string(),
        },
    )
    .await;
    hub.handle_message(
        id,
        ClientMessage::Filter {
            channel: Channel::Quotes,
            body: FilterBody::chain(42161),
        },
    )
    .await;
    rx
}

#[tokio::test]
async fn test_relay_reconnects_and_publishes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let upstream = tokio::spawn(async move {
        // First session is dropped right after the handshake.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let first = read_handshake(&mut ws).await;
        drop(ws);

        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let second = read_handshake(&mut ws).await;

        let info = json!({"type": "INFO", "message": "Session authenticated"});
        ws.send(Message::Text(info.to_string())).await.unwrap();
        let event = json!({
            "type": "POST_QUOTE",
            "body": {"chainId": "42161", "isBuy": true, "quoteId": "0xabc"}
        });
        ws.send(Message::Text(event.to_string())).await.unwrap();

        // Hold the session open until the relay closes it.
        while let Some(Ok(frame)) = ws.next().await {
            if matches!(frame, Message::Close(_)) {
                break;
            }
        }
        (first, second)
    });

    let orderbook = MockOrderbook::new().with_api_key("client");
    let hub = Arc::new(SubscriptionHub::new(Arc::new(orderbook), HubConfig::default()));
    let mut rx = subscribed_client(&hub).await;

    let mut config = RelayConfig::new(url, "relay-key", 42161);
    config.reconnect_base_delay_ms = 10;
    config.reconnect_max_delay_ms = 10;
    let relay = Arc::new(UpstreamRelay::new(config, hub.clone()));
    let runner = {
        let relay = relay.clone();
        tokio::spawn(async move { relay.run().await })
    };

    let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("no event relayed")
        .unwrap();
    match event {
        ServerMessage::PostQuote { body } => assert_eq!(body["quoteId"], "0xabc"),
        other => panic!("unexpected event: {other:?}"),
    }

    relay.shutdown();
    runner.await.unwrap().unwrap();

    let (first, second) = upstream.await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first[0],
        ClientMessage::Auth {
            api_key: "relay-key".to_string()
        }
    );
    assert_eq!(
        first[2],
        ClientMessage::Filter {
            channel: Channel::Rfq,
            body: FilterBody::chain(42161)
        }
    );
}

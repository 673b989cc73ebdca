// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bridge transport against an in-process sidecar.

use std::time::Duration;

use brokerbot_bridge::BridgeTransport;
use brokerbot_core::{ConnectionPhase, Session, SessionOptions, Transport, TransportEvent};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

type Sidecar = WebSocketStream<TcpStream>;

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

async fn accept(listener: &TcpListener) -> Sidecar {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

async fn next_frame(sidecar: &mut Sidecar) -> Value {
    loop {
        match sidecar.next().await.unwrap().unwrap() {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Close(_) => panic!("socket closed"),
            _ => continue,
        }
    }
}

async fn push(sidecar: &mut Sidecar, frame: Value) {
    sidecar
        .send(Message::text(frame.to_string()))
        .await
        .unwrap();
}

fn options() -> SessionOptions {
    SessionOptions {
        query_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

#[tokio::test]
async fn hello_then_events_in_order() {
    let (listener, url) = listen().await;
    let transport = BridgeTransport::new(url);

    let server = tokio::spawn(async move {
        let mut sidecar = accept(&listener).await;
        let hello = next_frame(&mut sidecar).await;
        push(&mut sidecar, json!({"type": "connection.update", "qr": "2@challenge"})).await;
        push(
            &mut sidecar,
            json!({"type": "connection.update", "connection": "open",
                   "me": {"id": "972500000001:4@s.whatsapp.net", "name": "Office"}}),
        )
        .await;
        push(&mut sidecar, json!({"type": "creds.update", "creds": {"k": 1}})).await;
        push(
            &mut sidecar,
            json!({"type": "messages.upsert", "messages": [
                {"id": "M1", "chatId": "120363@g.us", "content": {"kind": "text", "text": "hello"}}
            ]}),
        )
        .await;
        hello
    });

    let (_session, mut events) = transport
        .open(Some(json!({"stored": true})), &options())
        .await
        .unwrap();

    let hello = server.await.unwrap();
    assert_eq!(hello["type"], "hello");
    assert_eq!(hello["credentials"]["stored"], true);
    assert_eq!(hello["options"]["queryTimeoutMs"], 2000);

    let Some(TransportEvent::Connection(update)) = events.recv().await else {
        panic!("expected pairing code");
    };
    assert_eq!(update.qr.as_deref(), Some("2@challenge"));

    let Some(TransportEvent::Connection(update)) = events.recv().await else {
        panic!("expected open");
    };
    assert_eq!(update.connection, Some(ConnectionPhase::Open));
    assert_eq!(update.me.unwrap().user(), "972500000001");

    assert!(matches!(
        events.recv().await,
        Some(TransportEvent::Credentials(doc)) if doc == json!({"k": 1})
    ));
    let Some(TransportEvent::Messages(messages)) = events.recv().await else {
        panic!("expected messages");
    };
    assert_eq!(messages[0].text(), Some("hello"));
}

#[tokio::test]
async fn requests_are_correlated_by_id() {
    let (listener, url) = listen().await;
    let transport = BridgeTransport::new(url);

    let server = tokio::spawn(async move {
        let mut sidecar = accept(&listener).await;
        let _hello = next_frame(&mut sidecar).await;

        let meta = next_frame(&mut sidecar).await;
        assert_eq!(meta["type"], "group_metadata");
        assert_eq!(meta["groupId"], "120363@g.us");
        let id = meta["id"].clone();
        push(
            &mut sidecar,
            json!({"type": "response", "id": id,
                   "result": {"id": "120363@g.us", "subject": "Tel Aviv deals"}}),
        )
        .await;

        let send = next_frame(&mut sidecar).await;
        assert_eq!(send["type"], "send");
        assert_eq!(send["chatId"], "972500000001@s.whatsapp.net");
        assert_eq!(send["text"], "[BOT]\nno matches");
        let id = send["id"].clone();
        push(
            &mut sidecar,
            json!({"type": "response", "id": id, "error": "blocked"}),
        )
        .await;
        sidecar
    });

    let (session, _events) = transport.open(None, &options()).await.unwrap();

    let meta = session.group_metadata("120363@g.us").await.unwrap();
    assert_eq!(meta.subject, "Tel Aviv deals");

    let err = session
        .send_text("972500000001@s.whatsapp.net", "[BOT]\nno matches", None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("blocked"), "got {err}");

    drop(server.await.unwrap());
}

#[tokio::test]
async fn concurrent_requests_resolve_out_of_order() {
    let (listener, url) = listen().await;
    let transport = BridgeTransport::new(url);

    let server = tokio::spawn(async move {
        let mut sidecar = accept(&listener).await;
        let _hello = next_frame(&mut sidecar).await;
        let first = next_frame(&mut sidecar).await;
        let second = next_frame(&mut sidecar).await;
        for frame in [second, first] {
            let id = frame["id"].clone();
            let group = frame["groupId"].as_str().unwrap().to_string();
            let subject = format!("subject of {group}");
            push(
                &mut sidecar,
                json!({"type": "response", "id": id,
                       "result": {"id": group, "subject": subject}}),
            )
            .await;
        }

        // Hang up while the third request waits.
        let _third = next_frame(&mut sidecar).await;
        sidecar.close(None).await.unwrap();
    });

    let (session, _events) = transport.open(None, &options()).await.unwrap();
    let (a, b) = tokio::join!(
        session.group_metadata("1@g.us"),
        session.group_metadata("2@g.us")
    );
    assert_eq!(a.unwrap().subject, "subject of 1@g.us");
    assert_eq!(b.unwrap().subject, "subject of 2@g.us");

    let err = session.group_metadata("3@g.us").await.unwrap_err();
    assert!(
        !matches!(err, brokerbot_core::BrokerError::Timeout { .. }),
        "in-flight request should fail on hang-up, got {err}"
    );
    server.await.unwrap();
}

#[tokio::test]
async fn unanswered_request_times_out() {
    let (listener, url) = listen().await;
    let transport = BridgeTransport::new(url);
    let server = tokio::spawn(async move {
        let mut sidecar = accept(&listener).await;
        let _hello = next_frame(&mut sidecar).await;
        let _meta = next_frame(&mut sidecar).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let opts = SessionOptions {
        query_timeout: Duration::from_millis(200),
        ..Default::default()
    };
    let (session, _events) = transport.open(None, &opts).await.unwrap();
    let err = session.group_metadata("120363@g.us").await.unwrap_err();
    assert!(matches!(err, brokerbot_core::BrokerError::Timeout { .. }));
    server.abort();
}

#[tokio::test]
async fn dropped_socket_reports_generic_closure() {
    let (listener, url) = listen().await;
    let transport = BridgeTransport::new(url);
    let server = tokio::spawn(async move {
        let mut sidecar = accept(&listener).await;
        let _hello = next_frame(&mut sidecar).await;
        sidecar.close(None).await.unwrap();
    });

    let (_session, mut events) = transport.open(None, &options()).await.unwrap();
    server.await.unwrap();

    let Some(TransportEvent::Connection(update)) = events.recv().await else {
        panic!("expected closure");
    };
    assert_eq!(update.connection, Some(ConnectionPhase::Close));
    assert_eq!(update.status_code, Some(428));
    assert!(events.recv().await.is_none());
}

#[tokio::test]
async fn peer_closure_frame_is_forwarded() {
    let (listener, url) = listen().await;
    let transport = BridgeTransport::new(url);
    let server = tokio::spawn(async move {
        let mut sidecar = accept(&listener).await;
        let _hello = next_frame(&mut sidecar).await;
        push(
            &mut sidecar,
            json!({"type": "connection.update", "connection": "close", "statusCode": 401}),
        )
        .await;
        sidecar
    });

    let (_session, mut events) = transport.open(None, &options()).await.unwrap();
    let Some(TransportEvent::Connection(update)) = events.recv().await else {
        panic!("expected closure");
    };
    assert_eq!(update.status_code, Some(401));
    assert!(events.recv().await.is_none());
    drop(server.await.unwrap());
}

#[tokio::test]
async fn unreachable_sidecar_fails_setup() {
    let (listener, url) = listen().await;
    drop(listener);
    let transport = BridgeTransport::new(url);
    assert!(transport.open(None, &options()).await.is_err());
}

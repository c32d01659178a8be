//! End-to-end run against a local tokio-tungstenite server.

use futures_util::{SinkExt, StreamExt};
use lib_parksync::realtime::ws_url_for_host;
use lib_parksync::{ConnectionState, NotificationEvent, RealtimeSyncClient, SpotMap, SyncConfig};
use serde_json::json;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

const WAIT: Duration = Duration::from_secs(5);

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
    accept_async(stream).await.unwrap()
}

async fn push(ws: &mut WebSocketStream<TcpStream>, value: serde_json::Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

fn violation() -> serde_json::Value {
    json!({
        "type": "notification",
        "data": {
            "title": "Unauthorized vehicle",
            "body": "XYZ-123 in A2",
            "notification_type": "violation_alert",
            "spot": "A2",
            "intruder_plate": "XYZ-123",
            "timestamp": "2026-03-01T08:30:00Z"
        }
    })
}

async fn next_snapshot(rx: &mut UnboundedReceiver<SpotMap>) -> SpotMap {
    timeout(WAIT, rx.recv()).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_live_channel_dedups_across_reconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = ws_url_for_host(&listener.local_addr().unwrap().to_string(), false).unwrap();
    let config = SyncConfig {
        reconnect_delay: Duration::from_millis(100),
        ..SyncConfig::default()
    };

    let mut client = RealtimeSyncClient::new(url, config);
    let (snapshot_tx, mut snapshots) = mpsc::unbounded_channel::<SpotMap>();
    let (alert_tx, mut alerts) = mpsc::unbounded_channel::<NotificationEvent>();
    client.start(
        move |spots| {
            let _ = snapshot_tx.send(spots);
        },
        move |event| {
            let _ = alert_tx.send(event);
        },
    );

    let mut ws = accept(&listener).await;
    push(&mut ws, json!({ "A1": { "occupied": true, "plate": "KLM-4", "prob": 0.93 } })).await;
    push(&mut ws, violation()).await;
    push(&mut ws, violation()).await;
    push(&mut ws, json!({ "A1": { "occupied": false } })).await;

    let first = next_snapshot(&mut snapshots).await;
    assert_eq!(first["A1"].plate.as_deref(), Some("KLM-4"));
    let second = next_snapshot(&mut snapshots).await;
    assert!(!second["A1"].occupied);

    let alert = alerts.try_recv().unwrap();
    assert_eq!(alert.subject_key(), "A2-XYZ-123");
    assert_eq!(alerts.try_recv().unwrap_err(), TryRecvError::Empty);
    assert_eq!(client.state(), ConnectionState::Open);

    // Server drops the channel; the client comes back on its own.
    ws.close(None).await.unwrap();
    drop(ws);
    let mut ws = accept(&listener).await;

    push(&mut ws, violation()).await;
    push(&mut ws, json!({ "B1": {} })).await;
    let after = next_snapshot(&mut snapshots).await;
    assert!(after.contains_key("B1"));
    assert_eq!(alerts.try_recv().unwrap_err(), TryRecvError::Empty);

    let logged = client.notifications();
    assert_eq!(logged.len(), 3);
    assert_eq!(logged.iter().filter(|entry| entry.surfaced).count(), 1);
    assert_eq!(logged[2].created_at.to_rfc3339(), "2026-03-01T08:30:00+00:00");

    client.stop().await;
    let closing = timeout(WAIT, ws.next()).await.unwrap();
    assert!(matches!(closing, Some(Ok(Message::Close(_))) | Some(Err(_)) | None));
    assert_eq!(client.state(), ConnectionState::Closed);
}

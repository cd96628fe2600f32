//! Preview WebSocket tests
//!
//! Runs the preview endpoint on a local port and talks to it with a real
//! WebSocket client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use nixora_canvas::protocol::decode;
use nixora_canvas::{
    CanvasDocument, ComponentInstance, ComponentLibrary, ConnectionState, HostMessage,
    OriginPolicy, PreviewSessionManager, PreviewState, Props, Schema, preview_ws_handler,
};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const ORIGIN: &str = "http://localhost:5173";

async fn serve() -> (SocketAddr, Arc<PreviewSessionManager>) {
    let sessions = Arc::new(PreviewSessionManager::new(Arc::new(
        ComponentLibrary::builtin(),
    )));
    let state = Arc::new(PreviewState::new(
        sessions.clone(),
        OriginPolicy::new(vec!["localhost".into()]),
    ));
    let app = Router::new()
        .route("/api/v1/preview/ws/:session_id", get(preview_ws_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, sessions)
}

fn document(schema: Schema) -> CanvasDocument {
    let now = Utc::now();
    CanvasDocument {
        id: Uuid::new_v4(),
        user_id: "alice".into(),
        title: "Landing".into(),
        description: None,
        components: schema,
        is_published: false,
        published_at: None,
        publish_url: None,
        created_at: now,
        updated_at: now,
    }
}

async fn connect(addr: SocketAddr, session_id: Uuid, origin: &'static str) -> Option<Client> {
    let mut request = format!("ws://{}/api/v1/preview/ws/{}", addr, session_id)
        .into_client_request()
        .unwrap();
    request
        .headers_mut()
        .insert("Origin", HeaderValue::from_static(origin));
    connect_async(request).await.ok().map(|(ws, _)| ws)
}

async fn next_snapshot(ws: &mut Client) -> (Schema, Option<String>) {
    loop {
        let frame = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for snapshot")
            .unwrap()
            .unwrap();
        if let Message::Text(text) = frame {
            let HostMessage::UpdateComponents {
                schema,
                selected_instance_id,
            } = decode::<HostMessage>(&text).unwrap().unwrap();
            return (schema, selected_instance_id);
        }
    }
}

async fn ready(ws: &mut Client) {
    ws.send(Message::Text(r#"{"type":"preview:ready"}"#.to_string()))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_ready_then_live_updates() {
    let (addr, sessions) = serve().await;
    let schema = Schema::from_instances(vec![ComponentInstance::new("hero-1", "hero")]);
    let info = sessions.open_session("alice", &document(schema)).await;

    let mut ws = connect(addr, info.id, ORIGIN).await.unwrap();
    ready(&mut ws).await;

    let (schema, selected) = next_snapshot(&mut ws).await;
    assert_eq!(schema.ids(), vec!["hero-1".to_string()]);
    assert_eq!(selected, None);
    assert_eq!(
        sessions.get_session(info.id).await.unwrap().connection,
        ConnectionState::Synced
    );

    let added = sessions
        .update_session(info.id, |s| s.host.apply_local_add("cta", Props::new()))
        .await
        .flatten()
        .unwrap();
    let (schema, selected) = next_snapshot(&mut ws).await;
    assert_eq!(schema.ids(), vec!["hero-1".to_string(), added.clone()]);
    assert_eq!(selected, Some(added));
}

#[tokio::test]
async fn test_reorder_frame_updates_host() {
    let (addr, sessions) = serve().await;
    let schema = Schema::from_instances(vec![
        ComponentInstance::new("a", "hero"),
        ComponentInstance::new("b", "cta"),
        ComponentInstance::new("c", "testimonials"),
    ]);
    let info = sessions.open_session("alice", &document(schema)).await;

    let mut ws = connect(addr, info.id, ORIGIN).await.unwrap();
    ready(&mut ws).await;
    next_snapshot(&mut ws).await;

    // Unknown types and malformed frames are dropped without closing the link
    ws.send(Message::Text(r#"{"type":"preview:scrolled","payload":{}}"#.into()))
        .await
        .unwrap();
    ws.send(Message::Text("{not json".into())).await.unwrap();

    ws.send(Message::Text(
        r#"{"type":"preview:components-reordered","payload":{"instanceIds":["c","a"]}}"#.into(),
    ))
    .await
    .unwrap();

    let (schema, _) = next_snapshot(&mut ws).await;
    let expected: Vec<String> = ["c", "a", "b"].iter().map(|s| s.to_string()).collect();
    assert_eq!(schema.ids(), expected);
    assert_eq!(sessions.get_session(info.id).await.unwrap().schema.ids(), expected);
}

#[tokio::test]
async fn test_foreign_origin_rejected() {
    let (addr, sessions) = serve().await;
    let info = sessions.open_session("alice", &document(Schema::new())).await;

    assert!(connect(addr, info.id, "https://evil.test").await.is_none());
    assert_eq!(
        sessions.get_session(info.id).await.unwrap().connection,
        ConnectionState::Disconnected
    );
}

#[tokio::test]
async fn test_unknown_session_rejected() {
    let (addr, _sessions) = serve().await;
    assert!(connect(addr, Uuid::new_v4(), ORIGIN).await.is_none());
}

#[tokio::test]
async fn test_close_detaches_surface() {
    let (addr, sessions) = serve().await;
    let info = sessions.open_session("alice", &document(Schema::new())).await;

    let mut ws = connect(addr, info.id, ORIGIN).await.unwrap();
    ready(&mut ws).await;
    next_snapshot(&mut ws).await;
    ws.close(None).await.unwrap();

    let detached = timeout(Duration::from_secs(5), async {
        loop {
            let state = sessions.get_session(info.id).await.unwrap().connection;
            if state == ConnectionState::Disconnected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(detached.is_ok());
}

//! WebSocket live channel
//!
//! One task reads client frames and feeds them to `ChatService`; a second task
//! drains the session's outbound queue and sends server pings. The session
//! leaves every room as soon as the reader stops, whether the client closed,
//! errored or went idle.

use axum::body::Bytes;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use campus_chat::{ClientEvent, ServerEvent};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::http::{AppState, AuthUser};

pub async fn upgrade(
    ws: WebSocketUpgrade,
    State(service): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Response {
    ws.on_upgrade(move |socket| run_session(socket, service, user_id))
}

async fn run_session(socket: WebSocket, service: AppState, user_id: String) {
    let (session, mut events) = service.connect(&user_id);
    let (mut sink, mut stream) = socket.split();

    let heartbeat = service.config().heartbeat_interval;
    let idle_timeout = service.config().idle_timeout;

    let writer = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(heartbeat);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    match event.to_json() {
                        Ok(text) => {
                            if sink.send(WsMessage::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Failed to encode event: {}", e),
                    }
                }
                _ = ticker.tick() => {
                    if sink.send(WsMessage::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }

        let _ = sink.close().await;
    });

    loop {
        let frame = match tokio::time::timeout(idle_timeout, stream.next()).await {
            Ok(Some(Ok(frame))) => frame,
            Ok(Some(Err(e))) => {
                debug!("Session {} read error: {}", session.id(), e);
                break;
            }
            Ok(None) => break,
            Err(_) => {
                info!(
                    "Session {} idle for {:?}, closing",
                    session.id(),
                    idle_timeout
                );
                break;
            }
        };

        match frame {
            WsMessage::Text(text) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                Ok(event) => service.handle_client_event(&session, event).await,
                Err(e) => {
                    let _ = session.dispatch(ServerEvent::Error {
                        code: "bad_request".to_string(),
                        error: format!("Invalid event: {}", e),
                    });
                }
            },
            WsMessage::Close(_) => break,
            // Pings, pongs and binary frames only count as activity
            _ => {}
        }
    }

    service.disconnect(&session);
    writer.abort();
}

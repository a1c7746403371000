//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::{mpsc, Notify};

use crate::domain::{
    AuthClaim, ConnectionId, PusherChannel, RelayError, UserId,
};
use crate::infrastructure::dto::{
    conversion,
    websocket::{ClientEvent, ServerEvent},
};
use crate::relay::PresenceChange;

use super::super::state::AppState;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub user_id: String,
    #[serde(default)]
    pub token: String,
}

/// Admission: the auth gate runs before any other per-connection operation
/// is honored. A rejected claim (or a failing authorization collaborator)
/// terminates the connection attempt with 401; the relay itself stays up.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let claim = AuthClaim {
        user_id: query.user_id,
        token: query.token,
    };
    let user_id = match state.auth.authenticate(claim).await {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::warn!("Rejected connection attempt: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    tracing::info!("User '{}' admitted, upgrading connection", user_id);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: UserId) {
    let (mut sink, mut stream) = socket.split();

    // Register the connection and its outbound channel, then bring presence
    // online if this was the user's first connection.
    let (tx, mut rx) = mpsc::unbounded_channel();
    let registered = state.registry.register(user_id.clone()).await;
    let connection_id = registered.connection_id;
    state.pusher.register(connection_id, tx.clone()).await;
    if let Some(change) = state.presence.connection_opened(&user_id).await {
        fan_out_presence(&state, change).await;
    }
    tracing::info!("Connection '{}' opened for user '{}'", connection_id, user_id);

    // Outbound pump: everything pushed to this connection goes through the
    // channel and out the sink from a single writer task.
    let mut send_task = tokio::spawn(async move {
        while let Some(content) = rx.recv().await {
            if sink.send(Message::Text(content.into())).await.is_err() {
                break;
            }
        }
    });

    // Inbound loop: one event at a time per connection, which is what gives
    // the per-sender ordering guarantee. The stop signal is checked only at
    // frame boundaries, never mid-dispatch, so an accepted send finishes its
    // persist-then-broadcast even if the socket dies under it.
    let stop = Arc::new(Notify::new());
    let recv_stop = stop.clone();
    let recv_state = state.clone();
    let recv_user = user_id.clone();
    let mut recv_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                _ = recv_stop.notified() => break,
                next = stream.next() => match next {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) => {
                        tracing::debug!("WebSocket error on '{}': {}", connection_id, e);
                        break;
                    }
                    None => break,
                },
            };
            match frame {
                Message::Text(text) => {
                    match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => {
                            dispatch_event(&recv_state, connection_id, &recv_user, event, &tx)
                                .await;
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Unparseable event from '{}': {}",
                                connection_id,
                                e
                            );
                            let error = ServerEvent::Error {
                                event: "unknown".to_string(),
                                error: "invalid_event".to_string(),
                                message: format!("failed to parse event: {e}"),
                                temp_id: None,
                            };
                            let _ = tx.send(error.to_json());
                        }
                    }
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", connection_id);
                    break;
                }
                // Ping/pong is handled by the protocol layer
                _ => {}
            }
        }
    });

    // If the receive side ends, the outbound pump has nothing left to serve
    // and is aborted. If the pump dies first (the socket went away), the
    // receive side is stopped at the next frame boundary and awaited, so an
    // in-flight dispatch completes its persist-then-broadcast before cleanup.
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => {
            stop.notify_one();
            if let Err(e) = (&mut recv_task).await {
                tracing::debug!("Receive task for '{}' ended abnormally: {}", connection_id, e);
            }
        }
    };

    cleanup_connection(&state, connection_id, &user_id).await;
}

/// Disconnect path: compute the presence audience while room membership is
/// still intact, then unwind registration and downgrade presence if this was
/// the user's last connection.
async fn cleanup_connection(state: &Arc<AppState>, connection_id: ConnectionId, user_id: &UserId) {
    let audience = state.rooms.presence_audience(user_id).await;
    let left_threads = state.rooms.drop_connection(&connection_id).await;
    state.pusher.unregister(&connection_id).await;

    if let Some(unregistered) = state.registry.unregister(&connection_id).await {
        if let Some(change) = state
            .presence
            .connection_closed(&unregistered.user_id, unregistered.remaining)
            .await
        {
            let content = ServerEvent::presence(change.record).to_json();
            state.pusher.broadcast(audience, &content).await;
        }
    }
    // Typing entries for this user expire via the sweep; no explicit stop
    // here, since another of the user's connections may still be typing.
    tracing::info!(
        "Connection '{}' closed for user '{}' (left {} thread(s))",
        connection_id,
        user_id,
        left_threads.len()
    );
}

async fn dispatch_event(
    state: &Arc<AppState>,
    connection_id: ConnectionId,
    user_id: &UserId,
    event: ClientEvent,
    tx: &PusherChannel,
) {
    let tag = event.tag();
    match event {
        ClientEvent::JoinThread { thread_id } => {
            let result = match conversion::thread_id(thread_id) {
                Ok(thread_id) => state
                    .rooms
                    .join(connection_id, thread_id.clone())
                    .await
                    .map(|_| thread_id),
                Err(e) => Err(e),
            };
            match result {
                Ok(thread_id) => {
                    let ack = ServerEvent::ThreadJoined {
                        thread_id: thread_id.into_string(),
                    };
                    let _ = tx.send(ack.to_json());
                }
                Err(e) => send_error(tx, tag, &e),
            }
        }
        ClientEvent::LeaveThread { thread_id } => match conversion::thread_id(thread_id) {
            Ok(thread_id) => {
                // Stop typing while still a member so the room hears it,
                // then leave.
                state
                    .typing
                    .set_typing(&thread_id, user_id, false, Some(&connection_id))
                    .await;
                state.rooms.leave(connection_id, &thread_id).await;
                let ack = ServerEvent::ThreadLeft {
                    thread_id: thread_id.into_string(),
                };
                let _ = tx.send(ack.to_json());
            }
            Err(e) => send_error(tx, tag, &e),
        },
        ClientEvent::MessageSend {
            thread_id,
            temp_id,
            content,
            content_type,
            attachments,
        } => {
            let result = match conversion::thread_id(thread_id) {
                Ok(thread_id) => {
                    state
                        .relay
                        .send(
                            connection_id,
                            thread_id,
                            temp_id,
                            content,
                            content_type,
                            attachments,
                        )
                        .await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                send_error(tx, tag, &e);
            }
        }
        ClientEvent::Typing {
            thread_id,
            is_typing,
        } => match conversion::thread_id(thread_id) {
            Ok(thread_id) => {
                // Typing is scoped to rooms the connection actually joined.
                if !state.rooms.is_member(&connection_id, &thread_id).await {
                    send_error(
                        tx,
                        tag,
                        &RelayError::AccessDenied {
                            thread_id: thread_id.into_string(),
                        },
                    );
                    return;
                }
                state
                    .typing
                    .set_typing(&thread_id, user_id, is_typing, Some(&connection_id))
                    .await;
            }
            Err(e) => send_error(tx, tag, &e),
        },
        ClientEvent::MessageRead {
            thread_id,
            message_ids,
        } => {
            let result = match conversion::thread_id(thread_id) {
                Ok(thread_id) => {
                    state
                        .relay
                        .mark_read(connection_id, thread_id, conversion::message_ids(message_ids))
                        .await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                send_error(tx, tag, &e);
            }
        }
        ClientEvent::PresenceUpdate { status } => {
            if let Some(change) = state.presence.apply_update(user_id, status).await {
                fan_out_presence(state, change).await;
            }
        }
        ClientEvent::PresenceRequest { user_ids } => {
            let user_ids = conversion::user_ids(user_ids);
            let records = state.presence.get_bulk(&user_ids).await;
            let reply = ServerEvent::PresenceBulk {
                presences: records.into_iter().map(Into::into).collect(),
            };
            let _ = tx.send(reply.to_json());
        }
    }
}

/// Presence fan-out scoped to room co-members (plus the user's own
/// connections), not the whole server.
async fn fan_out_presence(state: &Arc<AppState>, change: PresenceChange) {
    let audience = state.rooms.presence_audience(&change.record.user_id).await;
    if audience.is_empty() {
        return;
    }
    let content = ServerEvent::presence(change.record).to_json();
    state.pusher.broadcast(audience, &content).await;
}

fn send_error(tx: &PusherChannel, event_tag: &str, error: &RelayError) {
    let _ = tx.send(ServerEvent::error(event_tag, error).to_json());
}

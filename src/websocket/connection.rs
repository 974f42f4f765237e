//! Per-connection receive/send loop (SPEC_FULL.md §4.A-§4.G).
//!
//! Each connection gets its own outbox channel (the same channel a
//! `PlayerSlot` holds once admitted) and two halves: a send task that
//! drains the outbox to the socket, and a receive loop that decodes
//! inbound frames and routes them through admission/dispatch under the
//! room lock. Opcode `13` (join) and `18` (timesync) are special-cased
//! here because they must work before (join) or regardless of (timesync)
//! a slot existing.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::broadcast::OutboundFrame;
use crate::protocol::decode;
use crate::room::admission::{self, JoinRequest};
use crate::room::core::{now_ms, RoomServer};
use crate::room::dispatcher;
use crate::room::player_table::PlayerId;

const OUTBOX_CAPACITY: usize = 64;

pub(super) async fn handle_socket(socket: WebSocket, server: Arc<RoomServer>, addr: SocketAddr) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<OutboundFrame>(OUTBOX_CAPACITY);

    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame.as_ref().to_string().into())).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    let mut player_id: Option<PlayerId> = None;

    while let Some(msg) = ws_receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(err) => {
                tracing::debug!(%addr, error = %err, "websocket receive error");
                break;
            }
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let frame = match decode(&text) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!(%addr, error = %err, "dropping malformed inbound frame");
                continue;
            }
        };

        if frame.opcode == "18" {
            let reply = dispatcher::handle_timesync(&frame, now_ms());
            let _ = tx.try_send(reply);
            continue;
        }

        if frame.opcode == "13" {
            let Some(request) = JoinRequest::from_value(frame.arg(0)) else {
                continue;
            };
            let mut guard = server.lock().await;
            let outcome = admission::admit(
                &mut guard,
                &server.rate_limiter,
                &server.config.restrictions,
                server.config.max_players,
                server.config.auto_assign_host,
                addr,
                player_id,
                request,
                tx.clone(),
            );
            if let admission::AdmissionOutcome::Admitted { id } = outcome {
                player_id = Some(id);
            }
            continue;
        }

        let Some(id) = player_id else {
            continue;
        };
        let is_kick_or_ban = frame.opcode == "9";
        {
            let mut guard = server.lock().await;
            dispatcher::dispatch(
                &mut guard,
                &server.rate_limiter,
                &server.config.restrictions,
                id,
                now_ms(),
                server.config.auto_assign_host,
                &frame,
            );
        }
        if is_kick_or_ban {
            server.persist_ban_list().await;
        }
    }

    if let Some(id) = player_id {
        let mut guard = server.lock().await;
        dispatcher::handle_disconnect(&mut guard, id, server.config.auto_assign_host, now_ms());
    }

    send_task.abort();
}

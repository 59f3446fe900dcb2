//! A framed broker session: one WebSocket bridged into the engine.
//!
//! The socket's read half feeds inbound frames into the bridge handle; the
//! write half drains the bridge's outbound queue, one frame per engine
//! write. The engine runs on its own task against the bridge's byte stream
//! and never sees WebSocket framing.

use std::io;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use mqgate_bridge::FrameStreamBridge;
use mqgate_core::{SessionConn, TransportKind};
use tracing::{debug, warn};

use crate::server::AppState;

/// Run one bridged broker session until the socket or the engine ends it.
pub async fn run(socket: WebSocket, state: AppState) {
    let id = state.ids.allocate();
    debug!(%id, "framed connection accepted");

    let FrameStreamBridge {
        stream,
        handle,
        mut outbound,
    } = FrameStreamBridge::new(state.config.bridge_outbound_capacity);

    let engine = Arc::clone(&state.engine);
    let engine_task = tokio::spawn(async move {
        engine
            .handle(SessionConn::new(id, TransportKind::Framed, stream))
            .await;
        debug!(%id, "framed session ended");
    });

    let token = state.shutdown.token();
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            () = token.cancelled() => {
                handle.transport_closed();
                let _ = ws_tx.close().await;
                break;
            }
            frame = outbound.recv() => match frame {
                Some(bytes) => {
                    if let Err(err) = ws_tx.send(Message::Binary(bytes)).await {
                        warn!(%id, %err, "frame send failed");
                        handle.transport_error(io::Error::new(
                            io::ErrorKind::BrokenPipe,
                            err.to_string(),
                        ));
                        break;
                    }
                }
                // Engine shut its write half: clean close toward the client.
                // The inbound side is signalled too, so an engine that keeps
                // reading after shutting down its writer sees EOF instead of
                // waiting on a socket nobody polls anymore.
                None => {
                    handle.transport_closed();
                    let _ = ws_tx.close().await;
                    break;
                }
            },
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Binary(frame))) => handle.push_frame(frame),
                Some(Ok(Message::Text(text))) => {
                    handle.push_frame(Bytes::copy_from_slice(text.as_bytes()));
                }
                Some(Ok(Message::Close(_))) => {
                    // Buffered bytes stay readable; the engine sees EOF after.
                    handle.transport_closed();
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Err(err)) => {
                    debug!(%id, %err, "framed transport error");
                    handle.transport_error(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        err.to_string(),
                    ));
                    break;
                }
                None => {
                    handle.transport_closed();
                    break;
                }
            },
        }
    }

    // Dropping the outbound receiver fails any further engine writes; the
    // engine notices and winds the session down on its own task.
    drop(outbound);
    let _ = engine_task.await;
    debug!(%id, "framed connection closed");
}

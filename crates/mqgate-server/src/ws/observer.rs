//! An observer connection: event records out, publish requests in.
//!
//! Outbound records come off the observer's bounded fan-out queue; the
//! fan-out side already dropped anything that did not fit, so this loop only
//! forwards. Inbound messages are parsed as [`ObserverRequest`]s; a
//! malformed one is logged and ignored without dropping the connection.

use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use mqgate_fanout::{ObserverConnection, ObserverRequest};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::server::AppState;

/// Run one observer connection until either side closes it.
pub async fn run(socket: WebSocket, state: AppState) {
    let id = state.ids.allocate();
    let (tx, mut rx) = mpsc::channel(state.config.observer_queue_capacity);
    let observer = Arc::new(ObserverConnection::new(id, tx));
    state.fanout.add(Arc::clone(&observer)).await;
    info!(%id, "observer connected");

    let token = state.shutdown.token();
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            () = token.cancelled() => {
                let _ = ws_tx.close().await;
                break;
            }
            record = rx.recv() => match record {
                Some(record) => {
                    let text = Utf8Bytes::from(record.as_str());
                    if ws_tx.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    handle_request(&state, text.as_str()).await;
                }
                Some(Ok(Message::Binary(_) | Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    debug!(%id, "observer transport closed");
                    break;
                }
                Some(Err(err)) => {
                    debug!(%id, %err, "observer transport error");
                    break;
                }
            },
        }
    }

    observer.begin_close();
    state.fanout.remove(id).await;
    info!(%id, dropped = observer.drop_count(), "observer disconnected");
}

/// Handle one inbound observer message.
async fn handle_request(state: &AppState, text: &str) {
    match ObserverRequest::parse(text) {
        Ok(ObserverRequest::Publish { topic, payload }) => {
            if let Err(err) = state
                .engine
                .inject_publish(&topic, Bytes::from(payload.into_bytes()))
                .await
            {
                warn!(topic, %err, "observer publish failed");
            }
        }
        Err(err) => {
            // Bad input costs the sender nothing but this log line.
            warn!(%err, "ignoring malformed observer message");
        }
    }
}

//! Plain TCP listener for native byte-stream clients.
//!
//! TCP connections need no bridging: the accepted socket is already the
//! ordered duplex byte stream the engine expects, so each connection is
//! wrapped in a [`SessionConn`] and handed straight over.

use std::sync::Arc;

use mqgate_core::{SessionConn, TransportKind};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::server::AppState;

/// Accept connections until `token` is cancelled.
///
/// Each accepted connection is handed to the engine on its own task; a
/// failed accept is logged and the loop continues.
pub async fn run_tcp_listener(listener: TcpListener, state: AppState, token: CancellationToken) {
    match listener.local_addr() {
        Ok(addr) => info!(%addr, "byte-stream listener ready"),
        Err(err) => warn!(%err, "byte-stream listener address unavailable"),
    }

    loop {
        tokio::select! {
            () = token.cancelled() => {
                info!("byte-stream listener stopping: shutdown");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let id = state.ids.allocate();
                    debug!(%id, %peer, "byte-stream connection accepted");
                    let engine = Arc::clone(&state.engine);
                    let _ = tokio::spawn(async move {
                        engine
                            .handle(SessionConn::new(id, TransportKind::Stream, stream))
                            .await;
                        debug!(%id, "byte-stream session ended");
                    });
                }
                Err(err) => {
                    warn!(%err, "accept failed");
                }
            },
        }
    }
}

//! WebSocket endpoints.
//!
//! Two upgrade routes share one Axum listener:
//!
//! - `/mqtt` — framed broker clients; each socket is bridged into an
//!   ordered byte stream and handed to the engine
//! - `/events` — observers; each socket joins the event fan-out set

pub mod observer;
pub mod session;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::Response;

use crate::server::AppState;

/// GET /mqtt — upgrade to a framed broker session.
pub async fn broker_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| session::run(socket, state))
}

/// GET /events — upgrade to an observer connection.
pub async fn observer_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| observer::run(socket, state))
}

//! Drains the engine's event feed into the fan-out.

use std::sync::Arc;

use mqgate_core::EngineEvent;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::record::FanoutEvent;
use crate::registry::EventFanout;

/// Task that converts [`EngineEvent`]s into wire records and broadcasts
/// them. One pump per process; the engine emits serially, so per-observer
/// ordering follows emission order.
pub struct EventPump {
    rx: broadcast::Receiver<EngineEvent>,
    fanout: Arc<EventFanout>,
}

impl EventPump {
    /// Create a pump over the engine's event receiver.
    #[must_use]
    pub fn new(rx: broadcast::Receiver<EngineEvent>, fanout: Arc<EventFanout>) -> Self {
        Self { rx, fanout }
    }

    /// Run until the engine drops its sender or `shutdown` fires. No event
    /// received after `shutdown` is forwarded.
    pub async fn run(mut self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("event pump stopping: shutdown");
                    break;
                }
                event = self.rx.recv() => match event {
                    Ok(event) => {
                        log_event(&event);
                        let record = FanoutEvent::from_engine(&event);
                        self.fanout.broadcast(&record).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(lagged = n, "event pump lagged, events skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("event pump stopping: engine event feed closed");
                        break;
                    }
                },
            }
        }
    }
}

/// Mirror the broker's lifecycle log lines.
fn log_event(event: &EngineEvent) {
    match event {
        EngineEvent::Connect { id, principal } => {
            info!(%id, principal, "client connected");
        }
        EngineEvent::Disconnect { id } => {
            info!(%id, "client disconnected");
        }
        EngineEvent::Publish {
            id,
            principal,
            topic,
            payload,
        } => {
            debug!(%id, principal, topic, bytes = payload.len(), "publish");
        }
        EngineEvent::Subscribe {
            id,
            principal,
            topics,
        } => {
            debug!(%id, principal, ?topics, "subscribe");
        }
    }
}

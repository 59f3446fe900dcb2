//! # mqgate-fanout
//!
//! Best-effort replication of broker lifecycle/traffic events to an open set
//! of observer connections.
//!
//! - [`ObserverConnection`] — one observer with its liveness state machine
//!   (`Connecting → Open → Closing → Closed`) and a bounded send queue
//! - [`EventFanout`] — the registry: add/remove observers, broadcast one
//!   serialized record to every live observer without letting any single
//!   observer block the rest
//! - [`FanoutEvent`] — the self-describing wire record pushed to observers
//! - [`EventPump`] — the task that drains the engine's event feed into the
//!   fan-out
//!
//! Delivery is fire-and-forget: there is no buffering or replay, an observer
//! that connects after an event never sees it, and a stalled observer only
//! loses its own records.

#![deny(unsafe_code)]

pub mod observer;
pub mod pump;
pub mod record;
pub mod registry;

pub use observer::{Liveness, ObserverConnection, SendOutcome};
pub use pump::EventPump;
pub use record::{FanoutError, FanoutEvent, ObserverRequest};
pub use registry::EventFanout;

//! # mqgate-core
//!
//! Foundation types for the broker gateway.
//!
//! This crate provides the shared vocabulary that all other gateway crates
//! depend on:
//!
//! - **Ids**: [`ConnectionId`] newtype plus a process-wide allocator
//! - **Principals**: [`Principal`] — the identity bound to a connection after
//!   authentication
//! - **Engine interface**: [`ProtocolEngine`] and [`BrokerHooks`] — the seam
//!   between the gateway and the external protocol engine
//! - **Lifecycle events**: [`EngineEvent`] emitted by the engine and mirrored
//!   to observers
//! - **Errors**: `AuthError` / `AclError` hierarchy via `thiserror`

#![deny(unsafe_code)]

pub mod engine;
pub mod errors;
pub mod events;
pub mod ids;
pub mod principal;

pub use engine::{BrokerHooks, ProtocolEngine, SessionConn, SessionStream};
pub use errors::{AclError, AuthError, EngineError, OperationKind};
pub use events::EngineEvent;
pub use ids::{ConnectionId, ConnectionIdAllocator, GATEWAY_CONNECTION_ID};
pub use principal::{Principal, TransportKind};

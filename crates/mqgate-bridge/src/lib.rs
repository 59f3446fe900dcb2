//! # mqgate-bridge
//!
//! Adapts a frame-oriented, full-duplex connection (a WebSocket, typically)
//! into the ordered byte stream the protocol engine expects.
//!
//! The bridge has three faces:
//!
//! - [`BridgeStream`] — the engine side: `AsyncRead + AsyncWrite` with
//!   standard read/write/close semantics.
//! - [`BridgeHandle`] — the transport side: feed inbound frames, signal
//!   close or error.
//! - The outbound frame receiver — drained by the transport's write task;
//!   each engine write becomes exactly one frame, in call order.
//!
//! The inbound half moves through an explicit `Open → HalfClosed → Closed`
//! state machine. A zero-length frame is an empty chunk, not end-of-stream.
//! A transport error discards unread buffered bytes and surfaces once to the
//! reader. Closing from either side is idempotent.

#![deny(unsafe_code)]

mod bridge;

pub use bridge::{BridgeHandle, BridgeStream, FrameStreamBridge, OutboundFrames};

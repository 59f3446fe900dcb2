//! Frame-to-byte-stream bridge implementation.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, Waker};

use bytes::{Buf, Bytes};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::mpsc;
use tokio_util::sync::PollSender;

/// Receiver half for frames the engine wrote; the transport's write task
/// drains it and sends one frame per item, in order.
pub type OutboundFrames = mpsc::Receiver<Bytes>;

/// Inbound half of the stream state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StreamState {
    /// Frames may still arrive.
    Open,
    /// Transport signalled a clean close; buffered bytes drain, then EOF.
    HalfClosed,
    /// Terminal. Reached via error (failed) or after teardown.
    Closed,
}

/// Shared inbound buffer between the transport handle and the reader.
struct Inbound {
    chunks: VecDeque<Bytes>,
    state: StreamState,
    /// Error to surface to the reader, delivered at most once.
    error: Option<io::Error>,
    /// Whether the stream ended abnormally.
    failed: bool,
    read_waker: Option<Waker>,
}

impl Inbound {
    fn wake_reader(&mut self) {
        if let Some(waker) = self.read_waker.take() {
            waker.wake();
        }
    }
}

fn transport_closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "transport closed")
}

/// A frame-oriented connection presented as an ordered duplex byte stream.
///
/// Construct with [`FrameStreamBridge::new`], hand [`BridgeStream`] to the
/// engine, keep [`BridgeHandle`] on the transport's read path, and drain
/// [`OutboundFrames`] on the transport's write path.
pub struct FrameStreamBridge {
    /// Engine-facing byte stream.
    pub stream: BridgeStream,
    /// Transport-facing event handle.
    pub handle: BridgeHandle,
    /// Frames written by the engine, to be sent on the transport.
    pub outbound: OutboundFrames,
}

impl FrameStreamBridge {
    /// Create a bridge whose outbound queue holds up to `outbound_capacity`
    /// frames. A full queue exerts backpressure on engine writes.
    #[must_use]
    pub fn new(outbound_capacity: usize) -> Self {
        let inbound = Arc::new(Mutex::new(Inbound {
            chunks: VecDeque::new(),
            state: StreamState::Open,
            error: None,
            failed: false,
            read_waker: None,
        }));
        let write_closed = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel(outbound_capacity);

        Self {
            stream: BridgeStream {
                inbound: Arc::clone(&inbound),
                write_closed: Arc::clone(&write_closed),
                writer: PollSender::new(tx),
            },
            handle: BridgeHandle {
                inbound,
                write_closed,
            },
            outbound: rx,
        }
    }
}

/// Transport-side handle: feeds inbound frames and lifecycle signals into
/// the bridge. All methods are idempotent and safe to call after teardown.
#[derive(Clone)]
pub struct BridgeHandle {
    inbound: Arc<Mutex<Inbound>>,
    write_closed: Arc<AtomicBool>,
}

impl BridgeHandle {
    /// Append one inbound frame, preserving arrival order.
    ///
    /// A zero-length frame is an empty chunk and is ignored. Frames arriving
    /// after close or error are dropped.
    pub fn push_frame(&self, frame: Bytes) {
        if frame.is_empty() {
            return;
        }
        let mut inbound = self.inbound.lock();
        if inbound.state != StreamState::Open {
            return;
        }
        inbound.chunks.push_back(frame);
        inbound.wake_reader();
    }

    /// Signal a clean transport close: buffered bytes remain readable, then
    /// the reader sees end-of-stream. Pending engine writes fail from here on.
    pub fn transport_closed(&self) {
        self.write_closed.store(true, Ordering::Release);
        let mut inbound = self.inbound.lock();
        if inbound.state == StreamState::Open {
            inbound.state = StreamState::HalfClosed;
            inbound.wake_reader();
        }
    }

    /// Terminate the stream abnormally. Unread buffered bytes are discarded
    /// and `err` is surfaced to the reader so the engine tears the session
    /// down. Later calls are no-ops; the first error wins.
    pub fn transport_error(&self, err: io::Error) {
        self.write_closed.store(true, Ordering::Release);
        let mut inbound = self.inbound.lock();
        if inbound.failed {
            return;
        }
        inbound.state = StreamState::Closed;
        inbound.failed = true;
        inbound.chunks.clear();
        inbound.error = Some(err);
        inbound.wake_reader();
    }

    /// Whether the inbound half still accepts frames.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inbound.lock().state == StreamState::Open
    }
}

/// Engine-facing ordered byte stream over a framed transport.
pub struct BridgeStream {
    inbound: Arc<Mutex<Inbound>>,
    write_closed: Arc<AtomicBool>,
    writer: PollSender<Bytes>,
}

impl AsyncRead for BridgeStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let mut inbound = this.inbound.lock();

        if let Some(front) = inbound.chunks.front_mut() {
            let n = front.len().min(buf.remaining());
            buf.put_slice(&front[..n]);
            front.advance(n);
            if front.is_empty() {
                let _ = inbound.chunks.pop_front();
            }
            return Poll::Ready(Ok(()));
        }

        if let Some(err) = inbound.error.take() {
            return Poll::Ready(Err(err));
        }

        match inbound.state {
            StreamState::Open => {
                inbound.read_waker = Some(cx.waker().clone());
                Poll::Pending
            }
            // EOF: nothing written into buf.
            StreamState::HalfClosed => Poll::Ready(Ok(())),
            StreamState::Closed => {
                if inbound.failed {
                    Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "transport failed",
                    )))
                } else {
                    Poll::Ready(Ok(()))
                }
            }
        }
    }
}

impl AsyncWrite for BridgeStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.write_closed.load(Ordering::Acquire) {
            return Poll::Ready(Err(transport_closed_error()));
        }
        match this.writer.poll_reserve(cx) {
            Poll::Ready(Ok(())) => {
                if buf.is_empty() {
                    return Poll::Ready(Ok(0));
                }
                if this.writer.send_item(Bytes::copy_from_slice(buf)).is_err() {
                    return Poll::Ready(Err(transport_closed_error()));
                }
                Poll::Ready(Ok(buf.len()))
            }
            Poll::Ready(Err(_)) => Poll::Ready(Err(transport_closed_error())),
            Poll::Pending => Poll::Pending,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        // A write completes once the frame is accepted into the outbound
        // queue; there is nothing further to flush from this side.
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.write_closed.store(true, Ordering::Release);
        // Closing the outbound queue tells the transport task to close the
        // underlying connection, exactly once. Repeat calls are no-ops.
        this.writer.close();
        Poll::Ready(Ok(()))
    }
}

impl Drop for BridgeStream {
    fn drop(&mut self) {
        // Dropping the engine side without an explicit shutdown still closes
        // the outbound queue, so the transport tears down rather than leak.
        self.writer.close();
    }
}

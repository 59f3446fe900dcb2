//! Interface to the external protocol engine.
//!
//! The engine owns the wire protocol, session/keep-alive state, and topic
//! matching. The gateway only hands it established byte streams, answers its
//! authentication/authorization hooks, and watches its lifecycle events.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;

use crate::errors::{AclError, AuthError, EngineError};
use crate::events::EngineEvent;
use crate::ids::ConnectionId;
use crate::principal::{Principal, TransportKind};

/// Byte-stream requirements for a session handed to the engine.
///
/// Satisfied by `TcpStream` directly and by the frame-stream bridge for
/// framed transports.
pub trait SessionStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> SessionStream for T {}

/// An established connection ready to run the wire protocol.
pub struct SessionConn {
    /// Process-unique connection id.
    pub id: ConnectionId,
    /// Transport the connection arrived on.
    pub kind: TransportKind,
    /// Ordered, flow-controlled duplex byte stream.
    pub stream: Box<dyn SessionStream>,
}

impl SessionConn {
    /// Wrap a stream for handoff to the engine.
    pub fn new(id: ConnectionId, kind: TransportKind, stream: impl SessionStream + 'static) -> Self {
        Self {
            id,
            kind,
            stream: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for SessionConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConn")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Decision hooks the engine consults, exactly once per client request.
///
/// Implemented by the gateway's auth/acl gates. Each method is a pure
/// decision: accept/deny plus (for subscribes) a possibly rewritten filter.
/// Denials are per-request, never fatal to the engine.
#[async_trait]
pub trait BrokerHooks: Send + Sync {
    /// Decide whether a presented identity may connect.
    ///
    /// Called once per connection, before any operation is evaluated. On
    /// success the returned [`Principal`] is attached to the connection for
    /// its lifetime.
    async fn authenticate(
        &self,
        id: ConnectionId,
        username: Option<&str>,
        password: Option<&[u8]>,
    ) -> Result<Principal, AuthError>;

    /// Decide whether `principal` may publish `payload` to `topic`.
    async fn authorize_publish(
        &self,
        id: ConnectionId,
        principal: &Principal,
        topic: &str,
        payload: &[u8],
    ) -> Result<(), AclError>;

    /// Decide whether `principal` may subscribe to `filter`.
    ///
    /// On success returns the granted filter, which a matching rule may have
    /// rewritten (narrowed). The gate never grants a broader filter than the
    /// one requested.
    async fn authorize_subscribe(
        &self,
        id: ConnectionId,
        principal: &Principal,
        filter: &str,
    ) -> Result<String, AclError>;
}

/// The external protocol engine, seen from the gateway.
#[async_trait]
pub trait ProtocolEngine: Send + Sync {
    /// Run the wire protocol over an established connection.
    ///
    /// Resolves when the session ends; the gateway spawns a task per call.
    async fn handle(&self, conn: SessionConn);

    /// Subscribe to the engine's lifecycle/traffic event feed.
    fn events(&self) -> broadcast::Receiver<EngineEvent>;

    /// Publish a message as the gateway's internal pseudo-connection.
    ///
    /// Used for observer-submitted publish requests. This path does not pass
    /// through the ACL gate and is implicitly trusted; callers must only
    /// feed it traffic from sources that are trusted by construction.
    async fn inject_publish(&self, topic: &str, payload: Bytes) -> Result<(), EngineError>;

    /// Shut the engine down, allowing in-flight session teardown.
    async fn close(&self);
}

//! # mqgate-auth
//!
//! The two decision gates the protocol engine consults:
//!
//! - [`AuthGate`] — once per connection: may this identity connect?
//! - [`AclPolicy`] — once per publish/subscribe: may this principal perform
//!   this topic operation?
//!
//! Both are pure decisions over in-memory data. The credential store and the
//! ACL rule list are plain serde types so deployments configure them as
//! data, never as code. [`GatewayHooks`] packages the two gates behind the
//! engine's hook interface.

#![deny(unsafe_code)]

pub mod acl;
pub mod credentials;
pub mod gate;
pub mod hooks;

pub use acl::{AclAction, AclPolicy, AclRule, Effect, TopicMatch, TopicOperation};
pub use credentials::{CredentialStore, UserEntry};
pub use gate::AuthGate;
pub use hooks::GatewayHooks;

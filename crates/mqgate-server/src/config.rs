//! Gateway configuration.

use std::collections::HashMap;

use mqgate_auth::acl::{AclAction, AclPolicy, AclRule, Effect, TopicMatch};
use mqgate_auth::credentials::UserEntry;
use serde::{Deserialize, Serialize};

/// One listener address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Whether this listener runs at all.
    pub enabled: bool,
}

impl ListenerConfig {
    /// `host:port` string for binding.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration for the whole gateway.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Native byte-stream listener (default port 1883).
    pub tcp: ListenerConfig,
    /// Framed (WebSocket) listener (default port 8883).
    pub ws: ListenerConfig,
    /// Frames a bridged session may queue outbound before engine writes
    /// see backpressure.
    pub bridge_outbound_capacity: usize,
    /// Records one observer may queue before further records are dropped
    /// for it.
    pub observer_queue_capacity: usize,
    /// Credential store: username → expected secret + attributes.
    #[serde(default)]
    pub users: HashMap<String, UserEntry>,
    /// Topic authorization policy.
    #[serde(default)]
    pub acl: AclPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            tcp: ListenerConfig {
                host: "0.0.0.0".into(),
                port: 1883,
                enabled: true,
            },
            ws: ListenerConfig {
                host: "0.0.0.0".into(),
                port: 8883,
                enabled: true,
            },
            bridge_outbound_capacity: 64,
            observer_queue_capacity: 256,
            // Empty users + no rules: nobody can connect until configured.
            users: HashMap::new(),
            acl: AclPolicy::default(),
        }
    }
}

impl GatewayConfig {
    /// The demo deployment: users `alice`/`bob`, bob confined to `bob/`
    /// for publishes and `bob/` + `common/` for subscribes, alice
    /// unrestricted.
    #[must_use]
    pub fn demo() -> Self {
        let mut users = HashMap::new();
        let _ = users.insert("alice".to_string(), UserEntry::new("password123"));
        let _ = users.insert("bob".to_string(), UserEntry::new("secret"));

        let acl = AclPolicy {
            reserved_prefixes: vec!["$SYS".to_string()],
            rules: vec![
                AclRule {
                    principal: Some("alice".to_string()),
                    action: AclAction::Any,
                    topic: TopicMatch::Prefix(String::new()),
                    effect: Effect::Allow,
                    rewrite: None,
                },
                AclRule {
                    principal: Some("bob".to_string()),
                    action: AclAction::Publish,
                    topic: TopicMatch::Prefix("bob/".to_string()),
                    effect: Effect::Allow,
                    rewrite: None,
                },
                AclRule {
                    principal: Some("bob".to_string()),
                    action: AclAction::Subscribe,
                    topic: TopicMatch::Prefix("bob/".to_string()),
                    effect: Effect::Allow,
                    rewrite: None,
                },
                AclRule {
                    principal: Some("bob".to_string()),
                    action: AclAction::Subscribe,
                    topic: TopicMatch::Prefix("common/".to_string()),
                    effect: Effect::Allow,
                    rewrite: None,
                },
            ],
        };

        Self {
            users,
            acl,
            ..Self::default()
        }
    }
}

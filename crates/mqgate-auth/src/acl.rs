//! Data-driven topic authorization.
//!
//! Policy shape: an ordered list of rules, each scoped to a principal (or
//! any), an action, and a topic matcher. The first matching rule wins; no
//! match denies. Publishes into a reserved namespace are denied before rules
//! are consulted, regardless of principal. A matching subscribe rule may
//! rewrite (narrow) the requested filter; the gate never widens one, and a
//! rewrite that escapes the rule's own matcher fails closed.

use mqgate_core::{AclError, OperationKind, Principal};
use serde::{Deserialize, Serialize};

/// One requested publish or subscribe, for the duration of one decision.
#[derive(Clone, Copy, Debug)]
pub struct TopicOperation<'a> {
    /// Publish or subscribe.
    pub kind: OperationKind,
    /// Topic name (publish) or filter (subscribe).
    pub topic: &'a str,
    /// Engine QoS hint, passed through untouched; never consulted here.
    pub qos_hint: Option<u8>,
}

impl<'a> TopicOperation<'a> {
    /// A publish to `topic`.
    #[must_use]
    pub fn publish(topic: &'a str) -> Self {
        Self {
            kind: OperationKind::Publish,
            topic,
            qos_hint: None,
        }
    }

    /// A subscribe to `filter`.
    #[must_use]
    pub fn subscribe(filter: &'a str) -> Self {
        Self {
            kind: OperationKind::Subscribe,
            topic: filter,
            qos_hint: None,
        }
    }
}

/// Which operations a rule applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AclAction {
    /// Publishes only.
    Publish,
    /// Subscribes only.
    Subscribe,
    /// Both.
    Any,
}

impl AclAction {
    fn covers(self, kind: OperationKind) -> bool {
        match self {
            Self::Publish => kind == OperationKind::Publish,
            Self::Subscribe => kind == OperationKind::Subscribe,
            Self::Any => true,
        }
    }
}

/// Topic matcher for a rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicMatch {
    /// Exact topic or filter name.
    Exact(String),
    /// Topic prefix, e.g. `bob/` covers `bob/status`.
    Prefix(String),
}

impl TopicMatch {
    fn matches(&self, topic: &str) -> bool {
        match self {
            Self::Exact(t) => t == topic,
            Self::Prefix(p) => topic.starts_with(p.as_str()),
        }
    }
}

/// Whether a matching rule grants or refuses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// Grant the operation.
    Allow,
    /// Refuse the operation.
    Deny,
}

/// One ordered policy rule.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AclRule {
    /// Principal name the rule is scoped to; `None` applies to everyone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,
    /// Operations the rule covers.
    #[serde(default = "AclRule::default_action")]
    pub action: AclAction,
    /// Topic matcher.
    #[serde(flatten)]
    pub topic: TopicMatch,
    /// Grant or refuse on match.
    pub effect: Effect,
    /// Replacement filter granted instead of the requested one
    /// (subscribe-only; used to narrow a broad request). Must itself fall
    /// under the rule's matcher, otherwise the match is refused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<String>,
}

impl AclRule {
    fn default_action() -> AclAction {
        AclAction::Any
    }

    fn matches(&self, principal: &Principal, op: TopicOperation<'_>) -> bool {
        self.principal
            .as_ref()
            .is_none_or(|name| name == &principal.name)
            && self.action.covers(op.kind)
            && self.topic.matches(op.topic)
    }
}

/// Ordered, deny-by-default topic authorization policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AclPolicy {
    /// Namespaces no client may publish into, checked before any rule.
    #[serde(default = "AclPolicy::default_reserved_prefixes")]
    pub reserved_prefixes: Vec<String>,
    /// Rules, evaluated top to bottom; first match wins.
    #[serde(default)]
    pub rules: Vec<AclRule>,
}

impl Default for AclPolicy {
    fn default() -> Self {
        Self {
            reserved_prefixes: Self::default_reserved_prefixes(),
            rules: Vec::new(),
        }
    }
}

impl AclPolicy {
    fn default_reserved_prefixes() -> Vec<String> {
        vec!["$SYS".to_string()]
    }

    /// Whether `topic` lies in a reserved namespace.
    #[must_use]
    pub fn is_reserved(&self, topic: &str) -> bool {
        self.reserved_prefixes
            .iter()
            .any(|p| topic.starts_with(p.as_str()))
    }

    fn first_match(&self, principal: &Principal, op: TopicOperation<'_>) -> Option<&AclRule> {
        self.rules.iter().find(|rule| rule.matches(principal, op))
    }

    /// Decide a publish. A denial rejects this operation only.
    pub fn authorize_publish(&self, principal: &Principal, topic: &str) -> Result<(), AclError> {
        if self.is_reserved(topic) {
            return Err(AclError::ReservedTopic {
                topic: topic.to_string(),
            });
        }
        let op = TopicOperation::publish(topic);
        match self.first_match(principal, op).map(|r| r.effect) {
            Some(Effect::Allow) => Ok(()),
            Some(Effect::Deny) | None => Err(AclError::Denied {
                principal: principal.name.clone(),
                kind: OperationKind::Publish,
                topic: topic.to_string(),
            }),
        }
    }

    /// Decide a subscribe. On success returns the granted filter, which a
    /// matching rule may have rewritten. A rewrite that does not fall under
    /// the rule's own matcher would widen the grant, so it denies instead.
    pub fn authorize_subscribe(
        &self,
        principal: &Principal,
        filter: &str,
    ) -> Result<String, AclError> {
        let op = TopicOperation::subscribe(filter);
        let granted = match self.first_match(principal, op) {
            Some(rule) if rule.effect == Effect::Allow => match &rule.rewrite {
                None => Some(filter.to_string()),
                Some(rewrite) if rule.topic.matches(rewrite) => Some(rewrite.clone()),
                Some(_) => None,
            },
            _ => None,
        };
        granted.ok_or_else(|| AclError::Denied {
            principal: principal.name.clone(),
            kind: OperationKind::Subscribe,
            topic: filter.to_string(),
        })
    }
}

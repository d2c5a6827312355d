//! Agent profile: the per-deployment personality and permissions.
//!
//! Loading profiles from disk is the embedder's concern; the runtime
//! only consumes the typed shape.

use serde::{Deserialize, Serialize};

use super::action::ActionKind;

/// Domain knowledge driving the domain-specific evaluator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainProfile {
    /// Short domain name, e.g. "moderation" or "tutoring".
    pub domain: String,
    /// Free-form guidance injected into the evaluator prompt.
    #[serde(default)]
    pub guidance: String,
    #[serde(default)]
    pub knowledge: serde_json::Map<String, serde_json::Value>,
}

/// The agent's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    /// Identity block surfaced to evaluators and the wakeup ritual.
    #[serde(default)]
    pub identity: String,
    /// Actions the action-selection evaluator may choose from.
    #[serde(default = "AgentProfile::default_permitted_actions")]
    pub permitted_actions: Vec<ActionKind>,
    /// Present when the deployment registers a domain-specific evaluator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<DomainProfile>,
}

impl AgentProfile {
    fn default_permitted_actions() -> Vec<ActionKind> {
        ActionKind::ALL.to_vec()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn permits(&self, kind: ActionKind) -> bool {
        self.permitted_actions.contains(&kind)
    }
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            identity: String::new(),
            permitted_actions: Self::default_permitted_actions(),
            domain: None,
        }
    }
}

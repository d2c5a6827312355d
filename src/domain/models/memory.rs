//! Graph memory model shared with the memory provider.

use serde::{Deserialize, Serialize};

/// Scope a graph node lives in.
///
/// Writes outside [`GraphScope::Local`] touch the agent's identity or its
/// environment and require wise-authority authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphScope {
    Local,
    Identity,
    Environment,
}

impl Default for GraphScope {
    fn default() -> Self {
        Self::Local
    }
}

impl GraphScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Identity => "identity",
            Self::Environment => "environment",
        }
    }

    /// Whether mutating this scope requires wise-authority sign-off.
    pub fn requires_authorization(&self) -> bool {
        matches!(self, Self::Identity | Self::Environment)
    }
}

/// Kind of entity a graph node describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Agent,
    User,
    Channel,
    Concept,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::User => "user",
            Self::Channel => "channel",
            Self::Concept => "concept",
        }
    }
}

/// A node in the external graph memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub scope: GraphScope,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl GraphNode {
    pub fn concept(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: NodeType::Concept,
            scope: GraphScope::Local,
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with_scope(mut self, scope: GraphScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Outcome status of a memory operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryOpStatus {
    Ok,
    Denied,
    Deferred,
    Error,
}

impl MemoryOpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Denied => "denied",
            Self::Deferred => "deferred",
            Self::Error => "error",
        }
    }
}

/// Result of a memorize/recall/forget call against the memory provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryOpResult {
    pub status: MemoryOpStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl MemoryOpResult {
    pub fn ok() -> Self {
        Self {
            status: MemoryOpStatus::Ok,
            reason: None,
            data: None,
        }
    }

    pub fn ok_with(data: serde_json::Value) -> Self {
        Self {
            status: MemoryOpStatus::Ok,
            reason: None,
            data: Some(data),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            status: MemoryOpStatus::Denied,
            reason: Some(reason.into()),
            data: None,
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: MemoryOpStatus::Error,
            reason: Some(reason.into()),
            data: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == MemoryOpStatus::Ok
    }
}

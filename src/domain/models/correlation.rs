//! Service correlations: durable proof that a handler's external effect
//! was (or was not) carried out.
//!
//! The wakeup sequence relies on these records: a wakeup step may only
//! complete after a COMPLETED "speak" correlation exists for its task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The service types routed through the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Communication,
    Memory,
    Tool,
    Audit,
    WiseAuthority,
    Llm,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Communication => "communication",
            Self::Memory => "memory",
            Self::Tool => "tool",
            Self::Audit => "audit",
            Self::WiseAuthority => "wise_authority",
            Self::Llm => "llm",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "communication" => Some(Self::Communication),
            "memory" => Some(Self::Memory),
            "tool" => Some(Self::Tool),
            "audit" => Some(Self::Audit),
            "wise_authority" => Some(Self::WiseAuthority),
            "llm" => Some(Self::Llm),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a correlation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStatus {
    Pending,
    Completed,
    Failed,
}

impl CorrelationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Durable record of one routed side effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCorrelation {
    pub id: String,
    pub service_type: ServiceType,
    pub handler_name: String,
    /// Effect discriminator, e.g. "speak" or "tool_execution".
    pub action_type: String,
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_id: Option<String>,
    #[serde(default)]
    pub request_data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_data: Option<serde_json::Value>,
    pub status: CorrelationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceCorrelation {
    pub fn new(
        service_type: ServiceType,
        handler_name: impl Into<String>,
        action_type: impl Into<String>,
        task_id: impl Into<String>,
        status: CorrelationStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            service_type,
            handler_name: handler_name.into(),
            action_type: action_type.into(),
            task_id: task_id.into(),
            thought_id: None,
            request_data: serde_json::Value::Null,
            response_data: None,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_thought(mut self, thought_id: impl Into<String>) -> Self {
        self.thought_id = Some(thought_id.into());
        self
    }

    pub fn with_request(mut self, request_data: serde_json::Value) -> Self {
        self.request_data = request_data;
        self
    }

    pub fn with_response(mut self, response_data: serde_json::Value) -> Self {
        self.response_data = Some(response_data);
        self
    }
}

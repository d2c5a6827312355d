//! Action model: the closed set of handler actions and their parameters.
//!
//! Action selection emits an [`ActionSelectionResult`] whose parameters
//! travel as JSON; the handler that owns the selected kind parses them
//! into its typed shape and rejects anything malformed.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::dma::ResourceUsage;
use super::memory::GraphNode;
use crate::domain::errors::{DomainError, DomainResult};

/// The closed set of actions a thought can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Observe,
    Speak,
    Tool,
    Ponder,
    Reject,
    Defer,
    Memorize,
    Recall,
    Forget,
    TaskComplete,
}

impl ActionKind {
    pub const ALL: [ActionKind; 10] = [
        Self::Observe,
        Self::Speak,
        Self::Tool,
        Self::Ponder,
        Self::Reject,
        Self::Defer,
        Self::Memorize,
        Self::Recall,
        Self::Forget,
        Self::TaskComplete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Observe => "observe",
            Self::Speak => "speak",
            Self::Tool => "tool",
            Self::Ponder => "ponder",
            Self::Reject => "reject",
            Self::Defer => "defer",
            Self::Memorize => "memorize",
            Self::Recall => "recall",
            Self::Forget => "forget",
            Self::TaskComplete => "task_complete",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "observe" => Some(Self::Observe),
            "speak" => Some(Self::Speak),
            "tool" => Some(Self::Tool),
            "ponder" => Some(Self::Ponder),
            "reject" => Some(Self::Reject),
            "defer" => Some(Self::Defer),
            "memorize" => Some(Self::Memorize),
            "recall" => Some(Self::Recall),
            "forget" => Some(Self::Forget),
            "task_complete" | "taskcomplete" => Some(Self::TaskComplete),
        _ => None,
        }
    }

    /// Terminal actions end the thought without further deliberation and
    /// are the only actions allowed to bypass the guardrail pass.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Defer | Self::Reject | Self::TaskComplete)
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for OBSERVE.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObserveParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Active observation fetches recent channel history; passive just
    /// records the observation.
    #[serde(default)]
    pub active: bool,
}

/// Parameters for SPEAK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeakParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    pub content: String,
}

/// Parameters for TOOL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

/// Parameters for PONDER.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PonderParams {
    pub questions: Vec<String>,
}

/// Parameters for REJECT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RejectParams {
    pub reason: String,
    /// Request an adaptive filter suppressing similar future requests.
    #[serde(default)]
    pub create_filter: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_priority: Option<String>,
}

/// Parameters for DEFER.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeferParams {
    pub reason: String,
    /// Per-evaluator summaries forwarded in the deferral package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethical_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_sense_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_summary: Option<String>,
}

/// Parameters for MEMORIZE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemorizeParams {
    pub node: GraphNode,
}

/// Parameters for RECALL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecallParams {
    pub node: GraphNode,
}

/// Parameters for FORGET.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForgetParams {
    pub node: GraphNode,
    pub reason: String,
    #[serde(default)]
    pub no_audit: bool,
}

/// Parameters for TASK_COMPLETE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskCompleteParams {
    #[serde(default = "TaskCompleteParams::default_reason")]
    pub completion_reason: String,
}

impl TaskCompleteParams {
    fn default_reason() -> String {
        "Task completed successfully".to_string()
    }
}

impl Default for TaskCompleteParams {
    fn default() -> Self {
        Self {
            completion_reason: Self::default_reason(),
        }
    }
}

/// Result returned by a tool provider for a correlated execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of the action selection evaluator.
///
/// `action_parameters` is raw JSON; use [`ActionSelectionResult::parse_params`]
/// to obtain the typed shape for the selected kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSelectionResult {
    pub selected_action: ActionKind,
    #[serde(default)]
    pub action_parameters: serde_json::Value,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_usage: Option<ResourceUsage>,
}

impl ActionSelectionResult {
    /// Build a result from typed parameters.
    pub fn new<P: Serialize>(
        selected_action: ActionKind,
        params: &P,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            selected_action,
            action_parameters: serde_json::to_value(params).unwrap_or(serde_json::Value::Null),
            rationale: rationale.into(),
            confidence: None,
            resource_usage: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Parse `action_parameters` into the typed shape `P`.
    ///
    /// Malformed parameters surface as [`DomainError::ValidationFailed`];
    /// handlers turn that into a FAILED thought plus a descriptive
    /// follow-up.
    pub fn parse_params<P: DeserializeOwned>(&self) -> DomainResult<P> {
        serde_json::from_value(self.action_parameters.clone()).map_err(|e| {
            DomainError::ValidationFailed(format!(
                "invalid parameters for {}: {e}",
                self.selected_action
            ))
        })
    }
}

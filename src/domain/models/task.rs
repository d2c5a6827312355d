//! Task domain model.
//!
//! A task is a persistent unit of intent, created from an external
//! observation or an internal goal. Thoughts attach to tasks and drive
//! them to a terminal status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a task in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is created but not yet picked up by the scheduler
    Pending,
    /// Task is live and may receive seed thoughts
    Active,
    /// Task finished successfully
    Completed,
    /// Task failed
    Failed,
    /// Task was escalated to a wise authority
    Deferred,
    /// Task was refused by the agent
    Rejected,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Deferred => "deferred",
            Self::Rejected => "rejected",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "completed" | "complete" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "deferred" => Some(Self::Deferred),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Check if this is a terminal state.
    ///
    /// A terminal task never returns to `Active` except via explicit
    /// operator reactivation (`Deferred -> Pending`).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Deferred | Self::Rejected
        )
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(&self) -> &'static [TaskStatus] {
        match self {
            Self::Pending => &[Self::Active, Self::Rejected, Self::Failed],
            Self::Active => &[Self::Completed, Self::Failed, Self::Deferred, Self::Rejected],
            Self::Completed => &[],
            Self::Failed => &[],
            Self::Rejected => &[],
            // Operator reactivation only.
            Self::Deferred => &[Self::Pending],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

/// Step of the wakeup ritual a task belongs to, when any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WakeupStep {
    VerifyIdentity,
    ValidateIntegrity,
    EvaluateResilience,
    AcceptIncompleteness,
    ExpressGratitude,
}

impl WakeupStep {
    /// The fixed order of the wakeup ritual.
    pub const SEQUENCE: [WakeupStep; 5] = [
        Self::VerifyIdentity,
        Self::ValidateIntegrity,
        Self::EvaluateResilience,
        Self::AcceptIncompleteness,
        Self::ExpressGratitude,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VerifyIdentity => "VERIFY_IDENTITY",
            Self::ValidateIntegrity => "VALIDATE_INTEGRITY",
            Self::EvaluateResilience => "EVALUATE_RESILIENCE",
            Self::AcceptIncompleteness => "ACCEPT_INCOMPLETENESS",
            Self::ExpressGratitude => "EXPRESS_GRATITUDE",
        }
    }
}

/// Closed context record carried by every task.
///
/// Replaces free-form context maps with the fields the runtime actually
/// consumes. Adapters populate what they know and leave the rest `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskContext {
    /// Channel the originating observation arrived on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Author of the originating observation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    /// Wakeup ritual step, for tasks that belong to the wakeup sequence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_type: Option<WakeupStep>,
    /// Service that created the task (adapter name, scheduler, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_service: Option<String>,
}

impl TaskContext {
    pub fn with_channel(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: Some(channel_id.into()),
            ..Self::default()
        }
    }
}

/// A persistent unit of intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Stable identifier. Well-known ids are reserved for protected roots.
    pub id: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
    #[serde(default)]
    pub context: TaskContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new pending task with a fresh id.
    pub fn new(description: impl Into<String>, priority: i32, context: TaskContext) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            status: TaskStatus::Pending,
            priority,
            parent_task_id: None,
            context,
            outcome: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a task with a fixed well-known id (wakeup root, monitor job).
    pub fn with_id(
        id: impl Into<String>,
        description: impl Into<String>,
        priority: i32,
        context: TaskContext,
    ) -> Self {
        Self {
            id: id.into(),
            ..Self::new(description, priority, context)
        }
    }

    pub fn with_parent(mut self, parent_task_id: impl Into<String>) -> Self {
        self.parent_task_id = Some(parent_task_id.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether this task is a step of the wakeup ritual.
    pub fn is_wakeup_step(&self) -> bool {
        self.context.step_type.is_some()
    }
}

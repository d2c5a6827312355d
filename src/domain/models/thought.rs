//! Thought domain model.
//!
//! A thought is a single deliberation attempt attached to a task. Each
//! pass through the decision-making pipeline consumes one pending thought
//! and writes exactly one terminal status, optionally spawning one
//! follow-up thought that re-enters the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::ActionSelectionResult;
use super::task::Task;

/// Status of a thought in the processing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThoughtStatus {
    /// Waiting in the store to be queued
    Pending,
    /// Owned by a pipeline worker
    Processing,
    /// Terminal: the selected action was carried out
    Completed,
    /// Terminal: the action or its validation failed
    Failed,
    /// Terminal: escalated to a wise authority
    Deferred,
}

impl Default for ThoughtStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl ThoughtStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Deferred => "deferred",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" | "complete" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "deferred" => Some(Self::Deferred),
            _ => None,
        }
    }

    /// A thought reaches a terminal status exactly once.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Deferred)
    }
}

/// Semantic discriminator for what kind of deliberation a thought is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThoughtType {
    /// Seed thought derived from a task
    Standard,
    /// Spawned by a handler after an action
    FollowUp,
    /// Re-queued deliberation carrying ponder notes
    Ponder,
    /// Derived from an external observation
    Observation,
    /// Memory operation result processing
    Memory,
    /// Error-describing thought
    Error,
    /// Wise-authority feedback processing
    Feedback,
    /// Wise-authority guidance incorporation
    Guidance,
}

impl Default for ThoughtType {
    fn default() -> Self {
        Self::Standard
    }
}

impl ThoughtType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::FollowUp => "follow_up",
            Self::Ponder => "ponder",
            Self::Observation => "observation",
            Self::Memory => "memory",
            Self::Error => "error",
            Self::Feedback => "feedback",
            Self::Guidance => "guidance",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Some(Self::Standard),
            "follow_up" => Some(Self::FollowUp),
            "ponder" => Some(Self::Ponder),
            "observation" => Some(Self::Observation),
            "memory" => Some(Self::Memory),
            "error" => Some(Self::Error),
            "feedback" => Some(Self::Feedback),
            "guidance" => Some(Self::Guidance),
            _ => None,
        }
    }
}

/// Closed context snapshot carried by a thought through the pipeline.
///
/// Built once from the parent task and enriched by the context builder;
/// evaluators and guardrails read it, handlers propagate it into
/// follow-ups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThoughtContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_service: Option<String>,
    /// Description of the source task, for evaluator prompts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_description: Option<String>,
    /// Identity block from the agent profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    /// Action performed by the parent thought, for follow-ups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_performed: Option<String>,
    /// Failure details when a handler produced an error follow-up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

/// A single deliberation attempt belonging to a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thought {
    pub id: String,
    pub source_task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_thought_id: Option<String>,
    pub thought_type: ThoughtType,
    pub status: ThoughtStatus,
    /// Processing round in which the thought was created.
    pub round_number: i32,
    /// How many ponder passes this chain of deliberation has consumed.
    pub ponder_count: u32,
    /// Questions accumulated by prior ponder rounds.
    #[serde(default)]
    pub ponder_notes: Vec<String>,
    #[serde(default)]
    pub context: ThoughtContext,
    pub content: String,
    /// The last action selected for this thought, written by its handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_action: Option<ActionSelectionResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thought {
    /// Seed thought for a freshly activated task.
    pub fn seed(task: &Task, round_number: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            source_task_id: task.id.clone(),
            parent_thought_id: None,
            thought_type: ThoughtType::Standard,
            status: ThoughtStatus::Pending,
            round_number,
            ponder_count: 0,
            ponder_notes: Vec::new(),
            context: ThoughtContext {
                channel_id: task.context.channel_id.clone(),
                author_id: task.context.author_id.clone(),
                author_name: task.context.author_name.clone(),
                origin_service: task.context.origin_service.clone(),
                task_description: Some(task.description.clone()),
                ..ThoughtContext::default()
            },
            content: task.description.clone(),
            final_action: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Observation thought for an incoming message attached to an
    /// existing task.
    pub fn observation(task: &Task, content: impl Into<String>, round_number: i32) -> Self {
        Self {
            thought_type: ThoughtType::Observation,
            content: content.into(),
            ..Self::seed(task, round_number)
        }
    }

    /// Return a new thought linked to `parent`.
    ///
    /// The parent is never mutated. `source_task_id` is inherited,
    /// `parent_thought_id` references the parent, and `ponder_count`
    /// advances by one so that cyclic reasoning chains stay bounded.
    pub fn follow_up(parent: &Thought, content: impl Into<String>, thought_type: ThoughtType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            source_task_id: parent.source_task_id.clone(),
            parent_thought_id: Some(parent.id.clone()),
            thought_type,
            status: ThoughtStatus::Pending,
            round_number: parent.round_number,
            ponder_count: parent.ponder_count + 1,
            ponder_notes: Vec::new(),
            context: parent.context.clone(),
            content: content.into(),
            final_action: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the originating message asks for deliberation verbatim.
    ///
    /// An external message consisting of the single word "ponder"
    /// (case-insensitive) short-circuits action selection.
    pub fn is_forced_ponder(&self) -> bool {
        matches!(
            self.thought_type,
            ThoughtType::Standard | ThoughtType::Observation
        ) && self.content.trim().eq_ignore_ascii_case("ponder")
    }
}

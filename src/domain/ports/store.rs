//! Store port: persisted tasks, thoughts, and correlations.
//!
//! The store is the only shared mutable state in the runtime. All status
//! mutations go through its atomic operations and must be safe under
//! concurrent writers; losers of a concurrent write observe a no-op.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ActionSelectionResult, CorrelationStatus, ServiceCorrelation, Task, TaskStatus, Thought,
    ThoughtStatus,
};

/// A pending thought joined with its source task's priority, ready to be
/// turned into a queue handle.
#[derive(Debug, Clone)]
pub struct QueuedThought {
    pub thought: Thought,
    pub task_priority: i32,
}

/// Repository interface for the three persisted tables.
#[async_trait]
pub trait Store: Send + Sync {
    // -- tasks ---------------------------------------------------------

    async fn add_task(&self, task: &Task) -> DomainResult<()>;

    async fn get_task(&self, id: &str) -> DomainResult<Option<Task>>;

    async fn task_exists(&self, id: &str) -> DomainResult<bool>;

    /// Atomically transition a task's status.
    ///
    /// Idempotent: returns the prior status. Illegal transitions
    /// (including any attempt to leave a terminal state other than
    /// operator reactivation) are a no-op that still returns the prior
    /// status.
    async fn update_task_status(&self, id: &str, status: TaskStatus) -> DomainResult<TaskStatus>;

    async fn update_task_outcome(
        &self,
        id: &str,
        outcome: serde_json::Value,
    ) -> DomainResult<()>;

    async fn count_tasks(&self, status: TaskStatus) -> DomainResult<u64>;

    /// Pending tasks eligible for activation, highest priority first.
    async fn get_pending_tasks_for_activation(&self, limit: usize) -> DomainResult<Vec<Task>>;

    /// Active tasks that have no thought yet.
    async fn get_tasks_needing_seed(&self, limit: usize) -> DomainResult<Vec<Task>>;

    async fn get_tasks_by_parent(&self, parent_id: &str) -> DomainResult<Vec<Task>>;

    /// Delete COMPLETED tasks older than the cutoff. Returns the number
    /// of rows removed.
    async fn delete_completed_tasks_before(&self, cutoff: DateTime<Utc>) -> DomainResult<u64>;

    // -- thoughts ------------------------------------------------------

    async fn add_thought(&self, thought: &Thought) -> DomainResult<()>;

    async fn get_thought(&self, id: &str) -> DomainResult<Option<Thought>>;

    /// Atomically transition a thought's status, optionally updating its
    /// final action and ponder state in the same statement.
    ///
    /// Returns the prior status. A thought already in a terminal state
    /// is never moved to a different status; such writes are a no-op.
    async fn update_thought_status(
        &self,
        id: &str,
        status: ThoughtStatus,
        final_action: Option<&ActionSelectionResult>,
        ponder_count: Option<u32>,
        ponder_notes: Option<&[String]>,
    ) -> DomainResult<ThoughtStatus>;

    async fn get_thoughts_by_task(&self, task_id: &str) -> DomainResult<Vec<Thought>>;

    /// Pending thoughts of active tasks, ordered by task priority then
    /// age, joined with that priority.
    async fn get_pending_thoughts(&self, limit: usize) -> DomainResult<Vec<QueuedThought>>;

    async fn delete_thoughts_by_ids(&self, ids: &[String]) -> DomainResult<u64>;

    // -- correlations --------------------------------------------------

    async fn add_correlation(&self, correlation: &ServiceCorrelation) -> DomainResult<()>;

    async fn get_correlations_by_task_and_action(
        &self,
        task_id: &str,
        action_type: &str,
        status: CorrelationStatus,
    ) -> DomainResult<Vec<ServiceCorrelation>>;
}

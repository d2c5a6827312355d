//! Processing queue handle.
//!
//! The queue between the scheduler and its workers carries lightweight
//! handles, not full thoughts; workers fetch the current thought row
//! from the store by id when they pick an item up.

use serde::{Deserialize, Serialize};

use super::thought::{Thought, ThoughtContext, ThoughtType};

/// Lightweight handle for a thought waiting to be processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingQueueItem {
    pub thought_id: String,
    pub source_task_id: String,
    pub thought_type: ThoughtType,
    /// Priority inherited from the source task at enqueue time.
    pub priority: i32,
    pub content: String,
    pub initial_context: ThoughtContext,
    /// Questions from prior ponder rounds, surfaced to evaluators.
    #[serde(default)]
    pub ponder_notes: Vec<String>,
}

impl ProcessingQueueItem {
    /// Derive a queue handle from a stored thought.
    pub fn from_thought(thought: &Thought, priority: i32) -> Self {
        Self {
            thought_id: thought.id.clone(),
            source_task_id: thought.source_task_id.clone(),
            thought_type: thought.thought_type,
            priority,
            content: thought.content.clone(),
            initial_context: thought.context.clone(),
            ponder_notes: thought.ponder_notes.clone(),
        }
    }
}

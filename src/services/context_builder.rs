//! Per-thought context assembly for the evaluators.

use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AgentProfile, Thought, ThoughtContext};
use crate::domain::ports::Store;

/// Enriches a thought's context snapshot before evaluation: source-task
/// details and the agent's identity block.
pub struct ContextBuilder {
    store: Arc<dyn Store>,
    profile: AgentProfile,
}

impl ContextBuilder {
    pub fn new(store: Arc<dyn Store>, profile: AgentProfile) -> Self {
        Self { store, profile }
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub async fn build(&self, thought: &Thought) -> DomainResult<ThoughtContext> {
        let mut context = thought.context.clone();

        if context.task_description.is_none() || context.channel_id.is_none() {
            if let Some(task) = self.store.get_task(&thought.source_task_id).await? {
                if context.task_description.is_none() {
                    context.task_description = Some(task.description);
                }
                if context.channel_id.is_none() {
                    context.channel_id = task.context.channel_id;
                }
                if context.author_id.is_none() {
                    context.author_id = task.context.author_id;
                }
                if context.author_name.is_none() {
                    context.author_name = task.context.author_name;
                }
            }
        }

        if context.identity.is_none() && !self.profile.identity.is_empty() {
            context.identity = Some(self.profile.identity.clone());
        }
        Ok(context)
    }
}

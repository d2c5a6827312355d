//! Safety guardrails applied to selected actions before dispatch.
//!
//! Guardrails are registered under ordered priorities (0 runs first).
//! A persistent failure overrides the action to PONDER; that override is
//! the only pre-dispatch action rewrite in the system.

pub mod epistemic;
pub mod orchestrator;

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ActionSelectionResult, GuardrailCheck, Thought};

/// Context handed to each guardrail check.
#[derive(Debug, Clone)]
pub struct GuardrailContext {
    pub thought_id: String,
    pub source_task_id: String,
    pub channel_id: Option<String>,
    pub round_number: i32,
    /// Identity block from the agent profile, for alignment checks.
    pub identity: Option<String>,
}

impl GuardrailContext {
    pub fn for_thought(thought: &Thought, identity: Option<String>) -> Self {
        Self {
            thought_id: thought.id.clone(),
            source_task_id: thought.source_task_id.clone(),
            channel_id: thought.context.channel_id.clone(),
            round_number: thought.round_number,
            identity,
        }
    }
}

/// One safety check over a selected action.
#[async_trait]
pub trait Guardrail: Send + Sync {
    fn name(&self) -> &str;

    async fn check(
        &self,
        action: &ActionSelectionResult,
        context: &GuardrailContext,
    ) -> DomainResult<GuardrailCheck>;
}

/// Ordered guardrail registry; priority 0 runs first.
#[derive(Default)]
pub struct GuardrailRegistry {
    entries: Vec<(u8, std::sync::Arc<dyn Guardrail>)>,
}

impl GuardrailRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, priority: u8, guardrail: std::sync::Arc<dyn Guardrail>) {
        self.entries.push((priority, guardrail));
        self.entries.sort_by_key(|(p, _)| *p);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Guardrails in priority order.
    pub fn ordered(&self) -> impl Iterator<Item = &std::sync::Arc<dyn Guardrail>> {
        self.entries.iter().map(|(_, g)| g)
    }
}

pub use epistemic::EpistemicGuardrail;
pub use orchestrator::GuardrailOrchestrator;

//! Covenant - ethically governed autonomous agent runtime.
//!
//! The cognitive scheduler at the heart of an agent: external
//! observations become tasks, tasks spawn thoughts, and every thought
//! runs through a multi-stage decision-making pipeline (parallel
//! ethical, common-sense, and domain evaluators, then sequential action
//! selection), is vetted by ordered safety guardrails, and finally
//! dispatches one of a closed set of actions. Deliberation is bounded
//! by a ponder counter; exhaustion and unsafe actions escalate to a
//! wise authority. A wakeup ritual bootstraps identity before normal
//! work.
//!
//! Collaborators (LLM backend, graph memory, transports, audit sink,
//! oversight channel) stay outside the crate behind the typed ports in
//! [`domain::ports`]; the sqlite store in [`infrastructure`] is the
//! only shared mutable state.

pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export the types most embedders touch.
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    ActionKind, ActionSelectionResult, AgentProfile, AppConfig, IncomingMessage, Task, TaskStatus,
    Thought, ThoughtStatus,
};
pub use infrastructure::database::{DatabaseConnection, SqliteStore};
pub use services::{
    AgentProcessor, Bus, ProcessorState, ServiceRegistry, ShutdownManager, TaskManager,
};

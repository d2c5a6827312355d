//! Decision-making evaluators.
//!
//! Four pluggable evaluator shapes feed the pipeline: ethical,
//! common-sense, domain-specific, and action selection. LLM-backed
//! implementations are provided; deployments may substitute their own.

pub mod action_selection;
pub mod common_sense;
pub mod domain_specific;
pub mod ethical;
pub mod executor;
pub mod orchestrator;

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ActionKind, ActionSelectionResult, CommonSenseResult, DmaResults, DomainSpecificResult,
    EthicalResult, Thought, ThoughtContext,
};

/// Input to the three initial evaluators: the thought under deliberation
/// plus its enriched context snapshot.
#[derive(Debug, Clone)]
pub struct EvaluationInput {
    pub thought: Thought,
    pub context: ThoughtContext,
}

/// Triaged input to the action-selection evaluator, assembled after the
/// initial fan-out.
#[derive(Debug, Clone)]
pub struct ActionSelectionInput {
    pub thought: Thought,
    pub context: ThoughtContext,
    pub dma_results: DmaResults,
    pub permitted_actions: Vec<ActionKind>,
    /// Deliberation round cap surfaced to the prompt.
    pub max_rounds: u32,
}

#[async_trait]
pub trait EthicalEvaluator: Send + Sync {
    async fn evaluate(&self, input: &EvaluationInput) -> DomainResult<EthicalResult>;
}

#[async_trait]
pub trait CommonSenseEvaluator: Send + Sync {
    async fn evaluate(&self, input: &EvaluationInput) -> DomainResult<CommonSenseResult>;
}

#[async_trait]
pub trait DomainSpecificEvaluator: Send + Sync {
    /// Short domain name, used in logs and deferral summaries.
    fn domain(&self) -> &str;

    async fn evaluate(&self, input: &EvaluationInput) -> DomainResult<DomainSpecificResult>;
}

#[async_trait]
pub trait ActionSelector: Send + Sync {
    async fn select_action(
        &self,
        input: &ActionSelectionInput,
    ) -> DomainResult<ActionSelectionResult>;
}

pub use action_selection::LlmActionSelector;
pub use common_sense::LlmCommonSenseEvaluator;
pub use domain_specific::ProfileDomainEvaluator;
pub use ethical::LlmEthicalEvaluator;
pub use executor::{run_with_retries, EvaluatorOutcome};
pub use orchestrator::DmaOrchestrator;

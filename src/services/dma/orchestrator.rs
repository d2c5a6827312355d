//! Evaluator orchestration: parallel fan-out, sequential selection.

use std::sync::Arc;

use tracing::{info, warn};

use super::executor::{run_with_retries, EvaluatorOutcome};
use super::{
    ActionSelectionInput, ActionSelector, CommonSenseEvaluator, DomainSpecificEvaluator,
    EthicalEvaluator, EvaluationInput,
};
use crate::domain::models::{
    ActionKind, ActionSelectionResult, AgentProfile, DmaFailure, DmaResults, PonderParams,
    Thought, ThoughtContext, WorkflowConfig,
};
use crate::services::shutdown::ShutdownManager;

/// Canned questions for the verbatim-"ponder" special case.
fn forced_ponder_questions() -> Vec<String> {
    vec![
        "What is this request actually asking for?".to_string(),
        "Which assumptions am I making that deserve a second look?".to_string(),
        "What would a careful, principled response look like here?".to_string(),
    ]
}

/// Fans the initial evaluators out concurrently, then runs action
/// selection sequentially over the triaged results.
pub struct DmaOrchestrator {
    ethical: Arc<dyn EthicalEvaluator>,
    common_sense: Arc<dyn CommonSenseEvaluator>,
    domain_specific: Option<Arc<dyn DomainSpecificEvaluator>>,
    selector: Arc<dyn ActionSelector>,
    shutdown: Arc<ShutdownManager>,
    retry_limit: u32,
    max_rounds: u32,
}

impl DmaOrchestrator {
    pub fn new(
        ethical: Arc<dyn EthicalEvaluator>,
        common_sense: Arc<dyn CommonSenseEvaluator>,
        domain_specific: Option<Arc<dyn DomainSpecificEvaluator>>,
        selector: Arc<dyn ActionSelector>,
        shutdown: Arc<ShutdownManager>,
        workflow: &WorkflowConfig,
    ) -> Self {
        Self {
            ethical,
            common_sense,
            domain_specific,
            selector,
            shutdown,
            retry_limit: workflow.dma_retry_limit,
            max_rounds: workflow.max_rounds,
        }
    }

    /// Run the ethical, common-sense, and (when registered) domain
    /// evaluators concurrently; wait for all; collect successes and
    /// per-evaluator errors. Partial failure is not fatal.
    pub async fn run_initial_dmas(&self, input: &EvaluationInput) -> DmaResults {
        let ethical_fut = run_with_retries("ethical", self.retry_limit, || {
            self.ethical.evaluate(input)
        });
        let cs_fut = run_with_retries("common_sense", self.retry_limit, || {
            self.common_sense.evaluate(input)
        });
        let ds_fut = async {
            match &self.domain_specific {
                Some(evaluator) => Some(
                    run_with_retries("domain_specific", self.retry_limit, || {
                        evaluator.evaluate(input)
                    })
                    .await,
                ),
                None => None,
            }
        };

        let fanned_out = async { tokio::join!(ethical_fut, cs_fut, ds_fut) };

        // Cancellation counts as retry exhaustion; evaluators make no
        // partial writes, so dropping them mid-flight is safe.
        let (ethical, common_sense, domain) = tokio::select! {
            results = fanned_out => results,
            () = self.shutdown.wait_for_shutdown() => {
                warn!(thought_id = %input.thought.id, "evaluator fan-out cancelled by shutdown");
                let cancelled = |name: &str| DmaFailure {
                    evaluator: name.to_string(),
                    message: "cancelled by shutdown".to_string(),
                };
                (
                    EvaluatorOutcome::Escalated(cancelled("ethical")),
                    EvaluatorOutcome::Escalated(cancelled("common_sense")),
                    self.domain_specific
                        .as_ref()
                        .map(|_| EvaluatorOutcome::Escalated(cancelled("domain_specific"))),
                )
            }
        };

        let mut results = DmaResults::default();
        match ethical {
            EvaluatorOutcome::Ok(r) => results.ethical = Some(r),
            EvaluatorOutcome::Escalated(f) => results.errors.push(f),
        }
        match common_sense {
            EvaluatorOutcome::Ok(r) => results.csdma = Some(r),
            EvaluatorOutcome::Escalated(f) => results.errors.push(f),
        }
        if let Some(outcome) = domain {
            match outcome {
                EvaluatorOutcome::Ok(r) => results.dsdma = Some(r),
                EvaluatorOutcome::Escalated(f) => results.errors.push(f),
            }
        }

        if !results.errors.is_empty() {
            warn!(
                thought_id = %input.thought.id,
                errors = results.errors.len(),
                "evaluator fan-out completed with degraded results"
            );
        }
        results
    }

    /// Run action selection sequentially after the fan-out.
    ///
    /// Two hard-coded special cases apply before the evaluator runs:
    /// a thought whose originating message is the single word "ponder"
    /// forces a PONDER, and a selection failure falls back to PONDER so
    /// the pipeline never crashes on a bad round.
    pub async fn run_action_selection(
        &self,
        thought: &Thought,
        context: &ThoughtContext,
        dma_results: DmaResults,
        profile: &AgentProfile,
    ) -> ActionSelectionResult {
        if thought.is_forced_ponder() {
            info!(thought_id = %thought.id, "forcing PONDER for verbatim ponder request");
            return ActionSelectionResult::new(
                ActionKind::Ponder,
                &PonderParams {
                    questions: forced_ponder_questions(),
                },
                "The originating message asked for deliberation verbatim.",
            );
        }

        let input = ActionSelectionInput {
            thought: thought.clone(),
            context: context.clone(),
            dma_results,
            permitted_actions: profile.permitted_actions.clone(),
            max_rounds: self.max_rounds,
        };

        let outcome = run_with_retries("action_selection", self.retry_limit, || {
            self.selector.select_action(&input)
        })
        .await;

        match outcome {
            EvaluatorOutcome::Ok(result) => result,
            EvaluatorOutcome::Escalated(failure) => {
                warn!(
                    thought_id = %thought.id,
                    error = %failure.message,
                    "action selection failed; falling back to PONDER"
                );
                ActionSelectionResult::new(
                    ActionKind::Ponder,
                    &PonderParams {
                        questions: vec![format!(
                            "Action selection failed ({}). What should happen instead?",
                            failure.message
                        )],
                    },
                    "Fallback after action selection failure.",
                )
                .with_confidence(0.1)
            }
        }
    }
}

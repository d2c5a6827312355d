//! LLM-backed ethical evaluator.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{EthicalEvaluator, EvaluationInput};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{EthicalResult, EthicalVerdict};
use crate::domain::ports::LlmRequest;
use crate::services::bus::Bus;

const SYSTEM_PROMPT: &str = "\
You are the ethical faculty of an autonomous agent. Evaluate the thought \
below against the agent's principles: beneficence, non-maleficence, \
honesty, autonomy of others, and fairness. Answer as strict JSON with \
fields: verdict (one of \"approve\", \"caution\", \"defer\", \"reject\"), \
rationale (string), alignment_check (object mapping each principle to a \
short note).";

#[derive(Debug, Deserialize)]
struct RawVerdict {
    verdict: EthicalVerdict,
    #[serde(default)]
    rationale: Option<String>,
    #[serde(default)]
    alignment_check: serde_json::Value,
}

/// Evaluates thoughts against the agent's principles via the LLM.
pub struct LlmEthicalEvaluator {
    bus: Arc<Bus>,
}

impl LlmEthicalEvaluator {
    pub const HANDLER_NAME: &'static str = "EthicalEvaluator";

    pub fn new(bus: Arc<Bus>) -> Self {
        Self { bus }
    }

    fn user_prompt(input: &EvaluationInput) -> String {
        let mut prompt = String::new();
        if let Some(identity) = &input.context.identity {
            prompt.push_str("Agent identity: ");
            prompt.push_str(identity);
            prompt.push('\n');
        }
        if let Some(task) = &input.context.task_description {
            prompt.push_str("Task: ");
            prompt.push_str(task);
            prompt.push('\n');
        }
        prompt.push_str("Thought: ");
        prompt.push_str(&input.thought.content);
        if !input.thought.ponder_notes.is_empty() {
            prompt.push_str("\nOpen questions from earlier deliberation:\n");
            for note in &input.thought.ponder_notes {
                prompt.push_str("- ");
                prompt.push_str(note);
                prompt.push('\n');
            }
        }
        prompt
    }
}

#[async_trait]
impl EthicalEvaluator for LlmEthicalEvaluator {
    async fn evaluate(&self, input: &EvaluationInput) -> DomainResult<EthicalResult> {
        let request = LlmRequest::new(SYSTEM_PROMPT, Self::user_prompt(input));
        let response = self
            .bus
            .generate_structured(Self::HANDLER_NAME, &request)
            .await?;

        let raw: RawVerdict = serde_json::from_value(response.content).map_err(|e| {
            DomainError::EvaluatorFailed {
                evaluator: Self::HANDLER_NAME.to_string(),
                message: format!("unparseable verdict: {e}"),
            }
        })?;

        Ok(EthicalResult {
            verdict: raw.verdict,
            rationale: raw.rationale,
            alignment_check: raw.alignment_check,
            resource_usage: response.resource_usage,
        })
    }
}

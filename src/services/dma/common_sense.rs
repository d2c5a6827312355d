//! LLM-backed common-sense evaluator.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{CommonSenseEvaluator, EvaluationInput};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::CommonSenseResult;
use crate::domain::ports::LlmRequest;
use crate::services::bus::Bus;

const SYSTEM_PROMPT: &str = "\
You are the common-sense faculty of an autonomous agent. Judge whether \
the thought below is plausible in the everyday physical and social \
world: no impossible physics, no category errors, no wildly atypical \
readings of the situation. Answer as strict JSON with fields: \
plausibility_score (0.0 to 1.0), flags (array of short strings naming \
any problems), reasoning (string).";

#[derive(Debug, Deserialize)]
struct RawPlausibility {
    plausibility_score: f32,
    #[serde(default)]
    flags: Vec<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Sanity-checks thoughts for real-world plausibility via the LLM.
pub struct LlmCommonSenseEvaluator {
    bus: Arc<Bus>,
}

impl LlmCommonSenseEvaluator {
    pub const HANDLER_NAME: &'static str = "CommonSenseEvaluator";

    pub fn new(bus: Arc<Bus>) -> Self {
        Self { bus }
    }

    fn user_prompt(input: &EvaluationInput) -> String {
        let mut prompt = String::new();
        if let Some(task) = &input.context.task_description {
            prompt.push_str("Task: ");
            prompt.push_str(task);
            prompt.push('\n');
        }
        prompt.push_str("Thought: ");
        prompt.push_str(&input.thought.content);
        prompt
    }
}

#[async_trait]
impl CommonSenseEvaluator for LlmCommonSenseEvaluator {
    async fn evaluate(&self, input: &EvaluationInput) -> DomainResult<CommonSenseResult> {
        let request = LlmRequest::new(SYSTEM_PROMPT, Self::user_prompt(input));
        let response = self
            .bus
            .generate_structured(Self::HANDLER_NAME, &request)
            .await?;

        let raw: RawPlausibility = serde_json::from_value(response.content).map_err(|e| {
            DomainError::EvaluatorFailed {
                evaluator: Self::HANDLER_NAME.to_string(),
                message: format!("unparseable plausibility result: {e}"),
            }
        })?;

        Ok(CommonSenseResult {
            plausibility_score: raw.plausibility_score.clamp(0.0, 1.0),
            flags: raw.flags,
            reasoning: raw.reasoning,
            resource_usage: response.resource_usage,
        })
    }
}

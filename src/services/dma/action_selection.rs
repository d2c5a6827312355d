//! LLM-backed action selection.
//!
//! Runs sequentially after the initial fan-out, sees the (possibly
//! degraded) evaluator results, and picks one action from the permitted
//! set with typed parameters.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{ActionSelectionInput, ActionSelector};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ActionKind, ActionSelectionResult};
use crate::domain::ports::LlmRequest;
use crate::services::bus::Bus;

const SYSTEM_PROMPT: &str = "\
You are the action-selection faculty of an autonomous agent. Given a \
thought, its context, and the faculty evaluations, choose exactly one \
action from the permitted set and provide its parameters. Answer as \
strict JSON with fields: selected_action (string), action_parameters \
(object), rationale (string).\n\
Parameter shapes: speak {channel_id?, content}; observe {channel_id?, \
active}; tool {name, arguments}; ponder {questions: [string]}; reject \
{reason}; defer {reason}; memorize/recall {node: {id, type, scope, \
attributes}}; forget {node, reason}; task_complete {completion_reason}.\n\
Prefer task_complete once the task's work is demonstrably done. Use \
ponder sparingly; deliberation rounds are bounded.";

#[derive(Debug, Deserialize)]
struct RawSelection {
    selected_action: String,
    #[serde(default)]
    action_parameters: serde_json::Value,
    rationale: String,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Chooses the next handler action via the LLM.
pub struct LlmActionSelector {
    bus: Arc<Bus>,
}

impl LlmActionSelector {
    pub const HANDLER_NAME: &'static str = "ActionSelector";

    pub fn new(bus: Arc<Bus>) -> Self {
        Self { bus }
    }

    fn user_prompt(input: &ActionSelectionInput) -> String {
        let permitted: Vec<&str> = input
            .permitted_actions
            .iter()
            .map(ActionKind::as_str)
            .collect();

        let mut prompt = format!("Permitted actions: [{}]\n", permitted.join(", "));
        if let Some(identity) = &input.context.identity {
            prompt.push_str(&format!("Agent identity: {identity}\n"));
        }
        if let Some(task) = &input.context.task_description {
            prompt.push_str(&format!("Task: {task}\n"));
        }
        if let Some(channel) = &input.context.channel_id {
            prompt.push_str(&format!("Channel: {channel}\n"));
        }
        prompt.push_str(&format!("Thought: {}\n", input.thought.content));

        if let Some(summary) = input.dma_results.ethical_summary() {
            prompt.push_str(&format!("Ethical evaluation: {summary}\n"));
        }
        if let Some(summary) = input.dma_results.common_sense_summary() {
            prompt.push_str(&format!("Common-sense evaluation: {summary}\n"));
        }
        if let Some(summary) = input.dma_results.domain_summary() {
            prompt.push_str(&format!("Domain evaluation: {summary}\n"));
        }
        for failure in &input.dma_results.errors {
            prompt.push_str(&format!(
                "Note: the {} evaluation is unavailable ({}).\n",
                failure.evaluator, failure.message
            ));
        }

        if !input.thought.ponder_notes.is_empty() {
            prompt.push_str("Questions from earlier deliberation rounds:\n");
            for note in &input.thought.ponder_notes {
                prompt.push_str(&format!("- {note}\n"));
            }
        }
        prompt.push_str(&format!(
            "Deliberation round {} of at most {}.\n",
            input.thought.ponder_count, input.max_rounds
        ));
        prompt
    }
}

#[async_trait]
impl ActionSelector for LlmActionSelector {
    async fn select_action(
        &self,
        input: &ActionSelectionInput,
    ) -> DomainResult<ActionSelectionResult> {
        let request = LlmRequest::new(SYSTEM_PROMPT, Self::user_prompt(input));
        let response = self
            .bus
            .generate_structured(Self::HANDLER_NAME, &request)
            .await?;

        let raw: RawSelection = serde_json::from_value(response.content).map_err(|e| {
            DomainError::EvaluatorFailed {
                evaluator: Self::HANDLER_NAME.to_string(),
                message: format!("unparseable selection: {e}"),
            }
        })?;

        let selected_action = ActionKind::from_str(&raw.selected_action).ok_or_else(|| {
            DomainError::EvaluatorFailed {
                evaluator: Self::HANDLER_NAME.to_string(),
                message: format!("unknown action kind: {}", raw.selected_action),
            }
        })?;
        if !input.permitted_actions.contains(&selected_action) {
            return Err(DomainError::EvaluatorFailed {
                evaluator: Self::HANDLER_NAME.to_string(),
                message: format!("action {selected_action} is not permitted for this profile"),
            });
        }

        Ok(ActionSelectionResult {
            selected_action,
            action_parameters: raw.action_parameters,
            rationale: raw.rationale,
            confidence: raw.confidence,
            resource_usage: response.resource_usage,
        })
    }
}

//! Profile-driven domain-specific evaluator.
//!
//! Only registered when the agent profile carries a domain section; the
//! orchestrator skips the slot otherwise.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{DomainSpecificEvaluator, EvaluationInput};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{DomainProfile, DomainSpecificResult};
use crate::domain::ports::LlmRequest;
use crate::services::bus::Bus;

#[derive(Debug, Deserialize)]
struct RawDomainJudgment {
    score: f32,
    #[serde(default)]
    flags: Vec<String>,
    #[serde(default)]
    recommended_action: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Judges thoughts against the deployment's domain guidance via the LLM.
pub struct ProfileDomainEvaluator {
    bus: Arc<Bus>,
    profile: DomainProfile,
}

impl ProfileDomainEvaluator {
    pub const HANDLER_NAME: &'static str = "DomainEvaluator";

    pub fn new(bus: Arc<Bus>, profile: DomainProfile) -> Self {
        Self { bus, profile }
    }

    fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are the domain faculty of an autonomous agent operating in the \
             \"{}\" domain. Judge how well the thought below fits the domain's \
             norms and the guidance that follows. Answer as strict JSON with \
             fields: score (0.0 to 1.0), flags (array of short strings), \
             recommended_action (string or null), reasoning (string).\n",
            self.profile.domain
        );
        if !self.profile.guidance.is_empty() {
            prompt.push_str("Guidance: ");
            prompt.push_str(&self.profile.guidance);
            prompt.push('\n');
        }
        if !self.profile.knowledge.is_empty() {
            prompt.push_str("Domain knowledge: ");
            prompt.push_str(
                &serde_json::to_string(&self.profile.knowledge).unwrap_or_default(),
            );
        }
        prompt
    }
}

#[async_trait]
impl DomainSpecificEvaluator for ProfileDomainEvaluator {
    fn domain(&self) -> &str {
        &self.profile.domain
    }

    async fn evaluate(&self, input: &EvaluationInput) -> DomainResult<DomainSpecificResult> {
        let request = LlmRequest::new(self.system_prompt(), input.thought.content.clone());
        let response = self
            .bus
            .generate_structured(Self::HANDLER_NAME, &request)
            .await?;

        let raw: RawDomainJudgment = serde_json::from_value(response.content).map_err(|e| {
            DomainError::EvaluatorFailed {
                evaluator: Self::HANDLER_NAME.to_string(),
                message: format!("unparseable domain judgment: {e}"),
            }
        })?;

        Ok(DomainSpecificResult {
            domain: self.profile.domain.clone(),
            score: raw.score.clamp(0.0, 1.0),
            flags: raw.flags,
            recommended_action: raw.recommended_action,
            reasoning: raw.reasoning,
            resource_usage: response.resource_usage,
        })
    }
}

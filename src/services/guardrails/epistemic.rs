//! LLM-backed epistemic guardrail.
//!
//! Measures two faculties over outbound SPEAK content: entropy (is the
//! response orderly or chaotic rambling?) and coherence (does it sound
//! like the agent's own principled voice?). Non-SPEAK actions pass
//! through untouched.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{Guardrail, GuardrailContext};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ActionKind, ActionSelectionResult, EpistemicData, GuardrailCheck, SpeakParams,
};
use crate::domain::ports::LlmRequest;
use crate::services::bus::Bus;

pub const DEFAULT_ENTROPY_THRESHOLD: f32 = 0.40;
pub const DEFAULT_COHERENCE_THRESHOLD: f32 = 0.60;

const SYSTEM_PROMPT: &str = "\
You are the epistemic faculty of an autonomous agent, measuring a draft \
response before it is sent. Report two numbers as strict JSON: entropy \
(0.0 = orderly and on-point, 1.0 = chaotic rambling) and coherence \
(0.0 = nothing the agent would say, 1.0 = fully in the agent's own \
principled voice). Fields: entropy, coherence.";

#[derive(Debug, Deserialize)]
struct RawFaculties {
    entropy: f32,
    coherence: f32,
}

/// Entropy/coherence check over outbound speech.
pub struct EpistemicGuardrail {
    bus: Arc<Bus>,
    entropy_threshold: f32,
    coherence_threshold: f32,
}

impl EpistemicGuardrail {
    pub const HANDLER_NAME: &'static str = "EpistemicGuardrail";

    pub fn new(bus: Arc<Bus>) -> Self {
        Self {
            bus,
            entropy_threshold: DEFAULT_ENTROPY_THRESHOLD,
            coherence_threshold: DEFAULT_COHERENCE_THRESHOLD,
        }
    }

    pub fn with_thresholds(mut self, entropy_threshold: f32, coherence_threshold: f32) -> Self {
        self.entropy_threshold = entropy_threshold;
        self.coherence_threshold = coherence_threshold;
        self
    }
}

#[async_trait]
impl Guardrail for EpistemicGuardrail {
    fn name(&self) -> &str {
        "epistemic"
    }

    async fn check(
        &self,
        action: &ActionSelectionResult,
        context: &GuardrailContext,
    ) -> DomainResult<GuardrailCheck> {
        if action.selected_action != ActionKind::Speak {
            return Ok(GuardrailCheck::pass());
        }
        let params: SpeakParams = action.parse_params()?;

        let mut user_prompt = String::new();
        if let Some(identity) = &context.identity {
            user_prompt.push_str("Agent identity: ");
            user_prompt.push_str(identity);
            user_prompt.push('\n');
        }
        user_prompt.push_str("Draft response: ");
        user_prompt.push_str(&params.content);

        let response = self
            .bus
            .generate_structured(Self::HANDLER_NAME, &LlmRequest::new(SYSTEM_PROMPT, user_prompt))
            .await?;
        let raw: RawFaculties = serde_json::from_value(response.content).map_err(|e| {
            DomainError::EvaluatorFailed {
                evaluator: Self::HANDLER_NAME.to_string(),
                message: format!("unparseable faculty measurement: {e}"),
            }
        })?;

        let entropy = raw.entropy.clamp(0.0, 1.0);
        let coherence = raw.coherence.clamp(0.0, 1.0);
        let epistemic_data = EpistemicData {
            entropy: Some(entropy),
            coherence: Some(coherence),
            optimization_veto: None,
            epistemic_humility: None,
        };

        if entropy > self.entropy_threshold {
            return Ok(GuardrailCheck::fail(format!(
                "Entropy too high: {entropy:.2} (threshold {:.2})",
                self.entropy_threshold
            ))
            .with_epistemic_data(epistemic_data));
        }
        if coherence < self.coherence_threshold {
            return Ok(GuardrailCheck::fail(format!(
                "Coherence too low: {coherence:.2} (threshold {:.2})",
                self.coherence_threshold
            ))
            .with_epistemic_data(epistemic_data));
        }
        Ok(GuardrailCheck::pass().with_epistemic_data(epistemic_data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CircuitBreakerSettings;
    use crate::domain::ports::{LlmResponse, LlmService};
    use crate::services::registry::{ServiceProvider, ServiceRegistration, ServiceRegistry};
    use serde_json::json;

    struct FixedLlm {
        content: serde_json::Value,
    }

    #[async_trait]
    impl LlmService for FixedLlm {
        async fn generate_structured(&self, _request: &LlmRequest) -> DomainResult<LlmResponse> {
            Ok(LlmResponse {
                content: self.content.clone(),
                resource_usage: None,
            })
        }
    }

    async fn guardrail_with(content: serde_json::Value) -> EpistemicGuardrail {
        let registry = Arc::new(ServiceRegistry::new(CircuitBreakerSettings::default()));
        registry
            .register(ServiceRegistration::new(
                "fixed-llm",
                ServiceProvider::Llm(Arc::new(FixedLlm { content })),
            ))
            .await;
        EpistemicGuardrail::new(Arc::new(Bus::new(registry)))
    }

    fn speak_action(content: &str) -> ActionSelectionResult {
        ActionSelectionResult::new(
            ActionKind::Speak,
            &SpeakParams {
                channel_id: Some("c".into()),
                content: content.into(),
            },
            "r",
        )
    }

    fn context() -> GuardrailContext {
        GuardrailContext {
            thought_id: "t".into(),
            source_task_id: "task".into(),
            channel_id: Some("c".into()),
            round_number: 0,
            identity: None,
        }
    }

    #[tokio::test]
    async fn test_calm_response_passes() {
        let guardrail = guardrail_with(json!({"entropy": 0.1, "coherence": 0.9})).await;
        let check = guardrail
            .check(&speak_action("hello there"), &context())
            .await
            .unwrap();
        assert!(check.passed);
        let data = check.epistemic_data.unwrap();
        assert_eq!(data.entropy, Some(0.1));
        assert_eq!(data.coherence, Some(0.9));
    }

    #[tokio::test]
    async fn test_high_entropy_fails() {
        let guardrail = guardrail_with(json!({"entropy": 0.8, "coherence": 0.9})).await;
        let check = guardrail
            .check(&speak_action("chaos"), &context())
            .await
            .unwrap();
        assert!(!check.passed);
        assert!(check.reason.unwrap().contains("Entropy too high"));
    }

    #[tokio::test]
    async fn test_low_coherence_fails() {
        let guardrail = guardrail_with(json!({"entropy": 0.1, "coherence": 0.2})).await;
        let check = guardrail
            .check(&speak_action("off-voice"), &context())
            .await
            .unwrap();
        assert!(!check.passed);
        assert!(check.reason.unwrap().contains("Coherence too low"));
    }

    #[tokio::test]
    async fn test_non_speak_actions_pass_through() {
        // No LLM call is made for non-SPEAK actions; a broken backend
        // would not matter.
        let guardrail = guardrail_with(json!("not json an object")).await;
        let action = ActionSelectionResult::new(
            ActionKind::TaskComplete,
            &crate::domain::models::TaskCompleteParams::default(),
            "done",
        );
        let check = guardrail.check(&action, &context()).await.unwrap();
        assert!(check.passed);
    }
}

//! Guardrail orchestration.
//!
//! Applies registered guardrails in priority order. A failing check is
//! retried a bounded number of times to absorb transient LLM noise;
//! persistent failure overrides the action to PONDER with questions
//! synthesized from the failure reason and epistemic signals.

use tracing::{info, warn};

use super::{GuardrailContext, GuardrailRegistry};
use crate::domain::models::{
    ActionKind, ActionSelectionResult, EpistemicData, GuardrailResult, PonderParams, SpeakParams,
    Thought, WorkflowConfig,
};

const MAX_OVERRIDE_QUESTIONS: usize = 5;

/// Runs the guardrail pass over each selected action.
pub struct GuardrailOrchestrator {
    registry: GuardrailRegistry,
    retry_limit: u32,
    entropy_threshold: f32,
    coherence_threshold: f32,
}

impl GuardrailOrchestrator {
    pub fn new(registry: GuardrailRegistry, workflow: &WorkflowConfig) -> Self {
        Self {
            registry,
            retry_limit: workflow.guardrail_retry_limit,
            entropy_threshold: super::epistemic::DEFAULT_ENTROPY_THRESHOLD,
            coherence_threshold: super::epistemic::DEFAULT_COHERENCE_THRESHOLD,
        }
    }

    /// Vet `action_result` for `thought`.
    ///
    /// SPEAK actions get a resolved channel id injected into their
    /// parameters first, so downstream checks and the handler see the
    /// final shape.
    pub async fn apply_guardrails(
        &self,
        action_result: ActionSelectionResult,
        thought: &Thought,
        identity: Option<String>,
    ) -> GuardrailResult {
        let mut action_result = action_result;
        if action_result.selected_action == ActionKind::Speak {
            self.inject_channel_id(&mut action_result, thought);
        }

        let context = GuardrailContext::for_thought(thought, identity);
        let mut epistemic_data: Option<EpistemicData> = None;

        for guardrail in self.registry.ordered() {
            let mut last_failure: Option<(String, Option<EpistemicData>)> = None;

            let attempts = self.retry_limit.max(1);
            for attempt in 1..=attempts {
                match guardrail.check(&action_result, &context).await {
                    Ok(check) if check.passed => {
                        if check.epistemic_data.is_some() {
                            epistemic_data = check.epistemic_data;
                        }
                        last_failure = None;
                        break;
                    }
                    Ok(check) => {
                        let reason = check
                            .reason
                            .unwrap_or_else(|| format!("guardrail {} failed", guardrail.name()));
                        warn!(
                            guardrail = guardrail.name(),
                            thought_id = %thought.id,
                            attempt,
                            reason = %reason,
                            "guardrail check failed"
                        );
                        last_failure = Some((reason, check.epistemic_data));
                    }
                    Err(e) => {
                        warn!(
                            guardrail = guardrail.name(),
                            thought_id = %thought.id,
                            attempt,
                            error = %e,
                            "guardrail check errored"
                        );
                        last_failure = Some((format!("guardrail {} errored: {e}", guardrail.name()), None));
                    }
                }
            }

            if let Some((reason, check_data)) = last_failure {
                if check_data.is_some() {
                    epistemic_data = check_data;
                }
                return self.override_to_ponder(action_result, thought, reason, epistemic_data);
            }
        }

        GuardrailResult::passed(action_result, epistemic_data)
    }

    fn inject_channel_id(&self, action_result: &mut ActionSelectionResult, thought: &Thought) {
        let Ok(mut params) = action_result.parse_params::<SpeakParams>() else {
            // Leave malformed parameters alone; the handler owns the
            // validation failure path.
            return;
        };
        if params.channel_id.is_none() {
            if let Some(channel_id) = &thought.context.channel_id {
                params.channel_id = Some(channel_id.clone());
                action_result.action_parameters =
                    serde_json::to_value(&params).unwrap_or(serde_json::Value::Null);
                info!(thought_id = %thought.id, channel_id = %channel_id, "injected channel id for SPEAK");
            } else {
                warn!(thought_id = %thought.id, "no channel id available to inject for SPEAK");
            }
        }
    }

    fn override_to_ponder(
        &self,
        original: ActionSelectionResult,
        thought: &Thought,
        reason: String,
        epistemic_data: Option<EpistemicData>,
    ) -> GuardrailResult {
        let mut questions = vec![
            format!("Why did the safety check fail with reason: {reason}?"),
            "What alternative approach would satisfy the constraints?".to_string(),
        ];

        if let Some(data) = &epistemic_data {
            if data.entropy.is_some_and(|e| e > self.entropy_threshold) {
                questions.push("How can the response become more orderly and on-point?".to_string());
            }
            if data.coherence.is_some_and(|c| c < self.coherence_threshold) {
                questions.push(
                    "How can the response better reflect the agent's own principles?".to_string(),
                );
            }
            if let Some(veto) = &data.optimization_veto {
                questions.push(format!(
                    "Optimization concern: {} - how to address it?",
                    veto.justification
                ));
            }
            if let Some(humility) = &data.epistemic_humility {
                questions.extend(humility.identified_uncertainties.iter().cloned());
            }
        }
        questions.truncate(MAX_OVERRIDE_QUESTIONS);

        warn!(
            thought_id = %thought.id,
            original_action = %original.selected_action,
            reason = %reason,
            "guardrail override: rewriting action to PONDER"
        );

        let final_action = ActionSelectionResult::new(
            ActionKind::Ponder,
            &PonderParams { questions },
            format!(
                "Original action '{}' failed guardrails: {reason}. Pondering for an aligned approach.",
                original.selected_action
            ),
        )
        .with_confidence(0.3);

        GuardrailResult {
            original_action: original,
            final_action,
            overridden: true,
            override_reason: Some(reason),
            epistemic_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Guardrail, GuardrailRegistry};
    use super::*;
    use crate::domain::errors::DomainResult;
    use crate::domain::models::{GuardrailCheck, Task, TaskContext};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct AlwaysPass;

    #[async_trait]
    impl Guardrail for AlwaysPass {
        fn name(&self) -> &str {
            "always-pass"
        }

        async fn check(
            &self,
            _action: &ActionSelectionResult,
            _context: &GuardrailContext,
        ) -> DomainResult<GuardrailCheck> {
            Ok(GuardrailCheck::pass())
        }
    }

    struct AlwaysFail {
        reason: &'static str,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Guardrail for AlwaysFail {
        fn name(&self) -> &str {
            "always-fail"
        }

        async fn check(
            &self,
            _action: &ActionSelectionResult,
            _context: &GuardrailContext,
        ) -> DomainResult<GuardrailCheck> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GuardrailCheck::fail(self.reason))
        }
    }

    struct FlakyThenPass {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Guardrail for FlakyThenPass {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn check(
            &self,
            _action: &ActionSelectionResult,
            _context: &GuardrailContext,
        ) -> DomainResult<GuardrailCheck> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(GuardrailCheck::fail("transient noise"))
            } else {
                Ok(GuardrailCheck::pass())
            }
        }
    }

    fn speak_result(channel: Option<&str>) -> ActionSelectionResult {
        ActionSelectionResult::new(
            ActionKind::Speak,
            &SpeakParams {
                channel_id: channel.map(String::from),
                content: "hello".into(),
            },
            "greeting",
        )
    }

    fn sample_thought() -> Thought {
        let task = Task::new("greet", 0, TaskContext::with_channel("chan-9"));
        Thought::seed(&task, 0)
    }

    fn orchestrator(guardrails: Vec<(u8, Arc<dyn Guardrail>)>) -> GuardrailOrchestrator {
        let mut registry = GuardrailRegistry::new();
        for (priority, guardrail) in guardrails {
            registry.register(priority, guardrail);
        }
        GuardrailOrchestrator::new(registry, &WorkflowConfig::default())
    }

    #[tokio::test]
    async fn test_pass_keeps_action() {
        let orchestrator = orchestrator(vec![(0, Arc::new(AlwaysPass))]);
        let result = orchestrator
            .apply_guardrails(speak_result(Some("c")), &sample_thought(), None)
            .await;
        assert!(!result.overridden);
        assert_eq!(result.final_action.selected_action, ActionKind::Speak);
    }

    #[tokio::test]
    async fn test_persistent_failure_overrides_to_ponder() {
        let failing = Arc::new(AlwaysFail {
            reason: "unsafe",
            calls: AtomicU32::new(0),
        });
        let orchestrator = orchestrator(vec![(0, Arc::clone(&failing) as _)]);

        let result = orchestrator
            .apply_guardrails(speak_result(Some("c")), &sample_thought(), None)
            .await;

        assert!(result.overridden);
        assert_eq!(result.final_action.selected_action, ActionKind::Ponder);
        assert_eq!(result.original_action.selected_action, ActionKind::Speak);
        assert!(result.override_reason.as_deref().unwrap().contains("unsafe"));
        // Default retry limit is 3.
        assert_eq!(failing.calls.load(Ordering::SeqCst), 3);

        let params: PonderParams = result.final_action.parse_params().unwrap();
        assert!(params.questions.iter().any(|q| q.contains("unsafe")));
        assert!(params.questions.len() <= MAX_OVERRIDE_QUESTIONS);
    }

    #[tokio::test]
    async fn test_transient_failure_is_absorbed_by_retry() {
        let flaky = Arc::new(FlakyThenPass {
            calls: AtomicU32::new(0),
        });
        let orchestrator = orchestrator(vec![(0, Arc::clone(&flaky) as _)]);

        let result = orchestrator
            .apply_guardrails(speak_result(Some("c")), &sample_thought(), None)
            .await;
        assert!(!result.overridden);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_channel_id_injection_for_speak() {
        let orchestrator = orchestrator(vec![(0, Arc::new(AlwaysPass))]);
        let result = orchestrator
            .apply_guardrails(speak_result(None), &sample_thought(), None)
            .await;
        let params: SpeakParams = result.final_action.parse_params().unwrap();
        assert_eq!(params.channel_id.as_deref(), Some("chan-9"));
    }

    #[tokio::test]
    async fn test_priority_zero_failure_wins() {
        let orchestrator = orchestrator(vec![
            (
                0,
                Arc::new(AlwaysFail {
                    reason: "first gate",
                    calls: AtomicU32::new(0),
                }),
            ),
            (1, Arc::new(AlwaysPass)),
        ]);
        let result = orchestrator
            .apply_guardrails(speak_result(Some("c")), &sample_thought(), None)
            .await;
        assert!(result.overridden);
        assert!(result
            .override_reason
            .as_deref()
            .unwrap()
            .contains("first gate"));
    }
}

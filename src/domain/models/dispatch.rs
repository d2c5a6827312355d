//! Dispatch context: the closed record handed to action handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::ActionKind;
use super::processing::{EpistemicData, GuardrailResult};
use super::thought::Thought;

/// Typed context for one handler dispatch.
///
/// Every field the handlers consume is explicit; there is no free-form
/// map. `guardrail_result` is `None` only for terminal actions (DEFER,
/// REJECT, TASK_COMPLETE), which bypass the guardrail pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    pub author_id: String,
    pub author_name: String,
    pub origin_service: String,
    pub handler_name: String,
    pub action_kind: ActionKind,
    pub thought_id: String,
    pub source_task_id: String,
    pub event_summary: String,
    pub event_timestamp: DateTime<Utc>,
    pub correlation_id: String,
    pub round_number: i32,
    /// Whether a wise authority has authorized privileged operations for
    /// this dispatch (identity/environment-scope memory writes).
    #[serde(default)]
    pub wa_authorized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardrail_result: Option<GuardrailResult>,
}

impl DispatchContext {
    /// Build a context for dispatching `action_kind` on `thought`.
    pub fn for_thought(
        thought: &Thought,
        action_kind: ActionKind,
        handler_name: impl Into<String>,
        event_summary: impl Into<String>,
        guardrail_result: Option<GuardrailResult>,
    ) -> Self {
        Self {
            channel_id: thought.context.channel_id.clone(),
            author_id: thought
                .context
                .author_id
                .clone()
                .unwrap_or_else(|| "system".to_string()),
            author_name: thought
                .context
                .author_name
                .clone()
                .unwrap_or_else(|| "system".to_string()),
            origin_service: thought
                .context
                .origin_service
                .clone()
                .unwrap_or_else(|| "agent".to_string()),
            handler_name: handler_name.into(),
            action_kind,
            thought_id: thought.id.clone(),
            source_task_id: thought.source_task_id.clone(),
            event_summary: event_summary.into(),
            event_timestamp: Utc::now(),
            correlation_id: Uuid::new_v4().to_string(),
            round_number: thought.round_number,
            wa_authorized: false,
            guardrail_result,
        }
    }

    pub fn was_overridden(&self) -> bool {
        self.guardrail_result
            .as_ref()
            .is_some_and(|g| g.overridden)
    }

    pub fn epistemic_data(&self) -> Option<&EpistemicData> {
        self.guardrail_result
            .as_ref()
            .and_then(|g| g.epistemic_data.as_ref())
    }
}

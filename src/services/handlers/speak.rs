//! SPEAK handler: deliver a message through the communication provider.

use async_trait::async_trait;
use serde_json::json;
use tracing::error;

use super::base::{ActionHandler, HandlerServices};
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ActionKind, ActionSelectionResult, CorrelationStatus, DispatchContext, ServiceCorrelation,
    ServiceType, SpeakParams, Thought, ThoughtStatus, ThoughtType,
};

pub struct SpeakHandler {
    services: HandlerServices,
}

impl SpeakHandler {
    pub const NAME: &'static str = "SpeakHandler";

    pub fn new(services: HandlerServices) -> Self {
        Self { services }
    }

    async fn record_correlation(
        &self,
        thought: &Thought,
        channel_id: &str,
        content: &str,
        success: bool,
    ) -> DomainResult<()> {
        let status = if success {
            CorrelationStatus::Completed
        } else {
            CorrelationStatus::Failed
        };
        let correlation = ServiceCorrelation::new(
            ServiceType::Communication,
            Self::NAME,
            "speak",
            thought.source_task_id.clone(),
            status,
        )
        .with_thought(thought.id.clone())
        .with_request(json!({"channel_id": channel_id, "content": content}))
        .with_response(json!({"success": success}));
        self.services.store.add_correlation(&correlation).await
    }
}

#[async_trait]
impl ActionHandler for SpeakHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn handle(
        &self,
        result: &ActionSelectionResult,
        thought: &Thought,
        context: &DispatchContext,
    ) -> DomainResult<Option<String>> {
        let params: SpeakParams = match result.parse_params() {
            Ok(params) => params,
            Err(e) => {
                return self
                    .services
                    .fail_validation(Self::NAME, ActionKind::Speak, result, thought, context, &e)
                    .await;
            }
        };

        self.services
            .audit(Self::NAME, ActionKind::Speak, context, "start")
            .await;

        let Some(channel_id) =
            HandlerServices::resolve_channel_id(params.channel_id.as_deref(), thought, context)
        else {
            self.services
                .write_terminal(&thought.id, ThoughtStatus::Failed, Some(result))
                .await?;
            self.record_correlation(thought, "", &params.content, false)
                .await?;
            self.services
                .audit(Self::NAME, ActionKind::Speak, context, "failed")
                .await;
            let follow_up_id = self
                .services
                .create_error_follow_up(
                    thought,
                    format!(
                        "SPEAK action failed for thought {}: no channel id could be resolved.",
                        thought.id
                    ),
                    ActionKind::Speak,
                    "missing channel id",
                )
                .await?;
            return Ok(Some(follow_up_id));
        };

        let channel_id = HandlerServices::sanitize_channel_id(&channel_id);
        let send_result = self
            .services
            .bus
            .send_message(Self::NAME, &channel_id, &params.content)
            .await;

        let success = match &send_result {
            Ok(()) => true,
            Err(e) if e.is_provider_unavailable() => {
                // The agent's entire purpose depends on being able to
                // speak; with no communication provider this process
                // cannot serve it.
                error!(
                    thought_id = %thought.id,
                    channel_id = %channel_id,
                    error = %e,
                    "CRITICAL COMMUNICATION FAILURE: unable to deliver message"
                );
                self.services.shutdown.request_global_shutdown(format!(
                    "communication failure: unable to send to channel {channel_id}: {e}"
                ));
                false
            }
            Err(e) => {
                error!(
                    thought_id = %thought.id,
                    channel_id = %channel_id,
                    error = %e,
                    "failed to send message"
                );
                false
            }
        };

        let final_status = if success {
            ThoughtStatus::Completed
        } else {
            ThoughtStatus::Failed
        };
        self.services
            .write_terminal(&thought.id, final_status, Some(result))
            .await?;
        self.record_correlation(thought, &channel_id, &params.content, success)
            .await?;

        let task_description = self
            .services
            .store
            .get_task(&thought.source_task_id)
            .await?
            .map_or_else(
                || format!("task {}", thought.source_task_id),
                |t| t.description,
            );

        let follow_up_id = if success {
            self.services
                .create_follow_up(
                    thought,
                    format!(
                        "You spoke \"{}\" in channel {} in response to the task: {}. \
                         The next action is almost certainly TASK_COMPLETE to mark \
                         that task handled. Do not speak again unless something \
                         genuinely new is required.",
                        params.content, channel_id, task_description
                    ),
                    ThoughtType::FollowUp,
                )
                .await?
        } else {
            self.services
                .create_error_follow_up(
                    thought,
                    format!(
                        "SPEAK action failed for thought {}: could not deliver \
                         \"{}\" to channel {}.",
                        thought.id, params.content, channel_id
                    ),
                    ActionKind::Speak,
                    send_result.err().map(|e| e.to_string()).unwrap_or_default(),
                )
                .await?
        };

        self.services
            .audit(
                Self::NAME,
                ActionKind::Speak,
                context,
                if success { "success" } else { "failed" },
            )
            .await;
        Ok(Some(follow_up_id))
    }
}

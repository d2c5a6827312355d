//! OBSERVE handler.
//!
//! Passive mode records the observation; active mode fetches recent
//! channel history through the communication provider and synthesizes a
//! follow-up from it.

use async_trait::async_trait;
use tracing::info;

use super::base::{ActionHandler, HandlerServices};
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ActionKind, ActionSelectionResult, DispatchContext, FetchedMessage, ObserveParams, Thought,
    ThoughtStatus, ThoughtType,
};

pub struct ObserveHandler {
    services: HandlerServices,
}

impl ObserveHandler {
    pub const NAME: &'static str = "ObserveHandler";

    pub fn new(services: HandlerServices) -> Self {
        Self { services }
    }

    fn summarize(channel_id: &str, messages: &[FetchedMessage]) -> String {
        if messages.is_empty() {
            return format!("Observed channel {channel_id}: no recent messages.");
        }
        let mut summary = format!(
            "Observed the last {} message(s) in channel {channel_id}:\n",
            messages.len()
        );
        for message in messages {
            summary.push_str(&format!(
                "- {}: {}\n",
                message.author_name.as_deref().unwrap_or("unknown"),
                message.content.as_deref().unwrap_or("")
            ));
        }
        summary.push_str("Synthesize what, if anything, needs a response.");
        summary
    }
}

#[async_trait]
impl ActionHandler for ObserveHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn handle(
        &self,
        result: &ActionSelectionResult,
        thought: &Thought,
        context: &DispatchContext,
    ) -> DomainResult<Option<String>> {
        // Null parameters mean a passive observation.
        let params: ObserveParams = if result.action_parameters.is_null() {
            ObserveParams::default()
        } else {
            match result.parse_params() {
                Ok(params) => params,
                Err(e) => {
                    return self
                        .services
                        .fail_validation(
                            Self::NAME,
                            ActionKind::Observe,
                            result,
                            thought,
                            context,
                            &e,
                        )
                        .await;
                }
            }
        };

        self.services
            .audit(Self::NAME, ActionKind::Observe, context, "start")
            .await;

        if !params.active {
            // Passive: the observation itself is the record.
            self.services
                .write_terminal(&thought.id, ThoughtStatus::Completed, Some(result))
                .await?;
            let follow_up_id = self
                .services
                .create_follow_up(
                    thought,
                    format!(
                        "Passive observation recorded for thought {}: {}. Review \
                         whether this completes the task or further steps are needed.",
                        thought.id, thought.content
                    ),
                    ThoughtType::Observation,
                )
                .await?;
            self.services
                .audit(Self::NAME, ActionKind::Observe, context, "success")
                .await;
            return Ok(Some(follow_up_id));
        }

        let Some(channel_id) =
            HandlerServices::resolve_channel_id(params.channel_id.as_deref(), thought, context)
        else {
            self.services
                .write_terminal(&thought.id, ThoughtStatus::Failed, Some(result))
                .await?;
            self.services
                .audit(Self::NAME, ActionKind::Observe, context, "failed")
                .await;
            let follow_up_id = self
                .services
                .create_error_follow_up(
                    thought,
                    format!(
                        "Active OBSERVE failed for thought {}: no channel id could be resolved.",
                        thought.id
                    ),
                    ActionKind::Observe,
                    "missing channel id",
                )
                .await?;
            return Ok(Some(follow_up_id));
        };

        let channel_id = HandlerServices::sanitize_channel_id(&channel_id);
        let limit = self.services.config.workflow.observe_history_limit;

        match self
            .services
            .bus
            .fetch_messages(Self::NAME, &channel_id, limit)
            .await
        {
            Ok(messages) => {
                info!(
                    thought_id = %thought.id,
                    channel_id = %channel_id,
                    fetched = messages.len(),
                    "active observation fetched channel history"
                );
                self.services
                    .write_terminal(&thought.id, ThoughtStatus::Completed, Some(result))
                    .await?;
                let follow_up_id = self
                    .services
                    .create_follow_up(
                        thought,
                        Self::summarize(&channel_id, &messages),
                        ThoughtType::Observation,
                    )
                    .await?;
                self.services
                    .audit(Self::NAME, ActionKind::Observe, context, "success")
                    .await;
                Ok(Some(follow_up_id))
            }
            Err(e) => {
                self.services
                    .write_terminal(&thought.id, ThoughtStatus::Failed, Some(result))
                    .await?;
                self.services
                    .audit(Self::NAME, ActionKind::Observe, context, "failed")
                    .await;
                let follow_up_id = self
                    .services
                    .create_error_follow_up(
                        thought,
                        format!(
                            "Active OBSERVE of channel {channel_id} failed for thought {}: {e}.",
                            thought.id
                        ),
                        ActionKind::Observe,
                        e.to_string(),
                    )
                    .await?;
                Ok(Some(follow_up_id))
            }
        }
    }
}

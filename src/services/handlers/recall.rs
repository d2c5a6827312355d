//! RECALL handler: read a node back from the graph memory.

use async_trait::async_trait;

use super::base::{ActionHandler, HandlerServices};
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ActionKind, ActionSelectionResult, DispatchContext, RecallParams, Thought, ThoughtStatus,
    ThoughtType,
};

pub struct RecallHandler {
    services: HandlerServices,
}

impl RecallHandler {
    pub const NAME: &'static str = "RecallHandler";

    pub fn new(services: HandlerServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl ActionHandler for RecallHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn handle(
        &self,
        result: &ActionSelectionResult,
        thought: &Thought,
        context: &DispatchContext,
    ) -> DomainResult<Option<String>> {
        let params: RecallParams = match result.parse_params() {
            Ok(params) => params,
            Err(e) => {
                return self
                    .services
                    .fail_validation(Self::NAME, ActionKind::Recall, result, thought, context, &e)
                    .await;
            }
        };

        self.services
            .audit(Self::NAME, ActionKind::Recall, context, "start")
            .await;

        let op_result = self.services.bus.recall(Self::NAME, &params.node).await;

        let (status, follow_up_text) = match &op_result {
            Ok(r) if r.is_ok() => {
                let data = r
                    .data
                    .as_ref()
                    .map_or_else(|| "no matching memories".to_string(), ToString::to_string);
                (
                    ThoughtStatus::Completed,
                    format!("Recall of node '{}' returned: {data}", params.node.id),
                )
            }
            Ok(r) => (
                ThoughtStatus::Completed,
                format!(
                    "Recall of node '{}' answered {}{}.",
                    params.node.id,
                    r.status.as_str(),
                    r.reason.as_deref().map(|s| format!(": {s}")).unwrap_or_default()
                ),
            ),
            Err(e) => (
                ThoughtStatus::Failed,
                format!("RECALL of node '{}' failed: {e}.", params.node.id),
            ),
        };

        self.services
            .write_terminal(&thought.id, status, Some(result))
            .await?;

        let follow_up_id = if status == ThoughtStatus::Completed {
            self.services
                .create_follow_up(thought, follow_up_text, ThoughtType::Memory)
                .await?
        } else {
            self.services
                .create_error_follow_up(
                    thought,
                    follow_up_text.clone(),
                    ActionKind::Recall,
                    follow_up_text,
                )
                .await?
        };

        self.services
            .audit(
                Self::NAME,
                ActionKind::Recall,
                context,
                if status == ThoughtStatus::Completed {
                    "success"
                } else {
                    "failed"
                },
            )
            .await;
        Ok(Some(follow_up_id))
    }
}

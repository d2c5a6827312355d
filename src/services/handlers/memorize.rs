//! MEMORIZE handler: write a node into the graph memory.

use async_trait::async_trait;
use tracing::warn;

use super::base::{ActionHandler, HandlerServices};
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ActionKind, ActionSelectionResult, DispatchContext, MemorizeParams, Thought, ThoughtStatus,
    ThoughtType,
};

pub struct MemorizeHandler {
    services: HandlerServices,
}

impl MemorizeHandler {
    pub const NAME: &'static str = "MemorizeHandler";

    pub fn new(services: HandlerServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl ActionHandler for MemorizeHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn handle(
        &self,
        result: &ActionSelectionResult,
        thought: &Thought,
        context: &DispatchContext,
    ) -> DomainResult<Option<String>> {
        let params: MemorizeParams = match result.parse_params() {
            Ok(params) => params,
            Err(e) => {
                return self
                    .services
                    .fail_validation(Self::NAME, ActionKind::Memorize, result, thought, context, &e)
                    .await;
            }
        };

        self.services
            .audit(Self::NAME, ActionKind::Memorize, context, "start")
            .await;

        // Identity and environment scopes are privileged.
        if params.node.scope.requires_authorization() && !context.wa_authorized {
            warn!(
                thought_id = %thought.id,
                node_id = %params.node.id,
                scope = params.node.scope.as_str(),
                "memorize denied: scope requires wise-authority authorization"
            );
            self.services
                .write_terminal(&thought.id, ThoughtStatus::Failed, Some(result))
                .await?;
            self.services
                .audit(Self::NAME, ActionKind::Memorize, context, "denied")
                .await;
            let follow_up_id = self
                .services
                .create_error_follow_up(
                    thought,
                    format!(
                        "MEMORIZE of node '{}' was denied: {} scope writes require \
                         wise-authority authorization. Consider DEFER to request it.",
                        params.node.id,
                        params.node.scope.as_str()
                    ),
                    ActionKind::Memorize,
                    "permission denied",
                )
                .await?;
            return Ok(Some(follow_up_id));
        }

        let op_result = self.services.bus.memorize(Self::NAME, &params.node).await;

        let (status, summary) = match &op_result {
            Ok(r) if r.is_ok() => (
                ThoughtStatus::Completed,
                format!("Memorized node '{}' successfully.", params.node.id),
            ),
            Ok(r) => (
                ThoughtStatus::Failed,
                format!(
                    "Memory provider answered {} for node '{}'{}.",
                    r.status.as_str(),
                    params.node.id,
                    r.reason.as_deref().map(|s| format!(": {s}")).unwrap_or_default()
                ),
            ),
            Err(e) => (
                ThoughtStatus::Failed,
                format!("MEMORIZE of node '{}' failed: {e}.", params.node.id),
            ),
        };

        self.services
            .write_terminal(&thought.id, status, Some(result))
            .await?;

        let follow_up_id = if status == ThoughtStatus::Completed {
            self.services
                .create_follow_up(
                    thought,
                    format!("{summary} If the task is now handled, select TASK_COMPLETE."),
                    ThoughtType::Memory,
                )
                .await?
        } else {
            self.services
                .create_error_follow_up(thought, summary.clone(), ActionKind::Memorize, summary)
                .await?
        };

        self.services
            .audit(
                Self::NAME,
                ActionKind::Memorize,
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

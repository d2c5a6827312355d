//! FORGET handler: remove a node from the graph memory.
//!
//! Deletion is gated by a permission predicate before touching the
//! provider; privileged scopes need wise-authority authorization.

use async_trait::async_trait;
use tracing::warn;

use super::base::{ActionHandler, HandlerServices};
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ActionKind, ActionSelectionResult, DispatchContext, ForgetParams, Thought, ThoughtStatus,
    ThoughtType,
};

pub struct ForgetHandler {
    services: HandlerServices,
}

impl ForgetHandler {
    pub const NAME: &'static str = "ForgetHandler";

    pub fn new(services: HandlerServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl ActionHandler for ForgetHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn handle(
        &self,
        result: &ActionSelectionResult,
        thought: &Thought,
        context: &DispatchContext,
    ) -> DomainResult<Option<String>> {
        let params: ForgetParams = match result.parse_params() {
            Ok(params) => params,
            Err(e) => {
                return self
                    .services
                    .fail_validation(Self::NAME, ActionKind::Forget, result, thought, context, &e)
                    .await;
            }
        };

        if !params.no_audit {
            self.services
                .audit(Self::NAME, ActionKind::Forget, context, "start")
                .await;
        }

        if params.node.scope.requires_authorization() && !context.wa_authorized {
            warn!(
                thought_id = %thought.id,
                node_id = %params.node.id,
                scope = params.node.scope.as_str(),
                "forget denied: scope requires wise-authority authorization"
            );
            self.services
                .write_terminal(&thought.id, ThoughtStatus::Failed, Some(result))
                .await?;
            if !params.no_audit {
                self.services
                    .audit(Self::NAME, ActionKind::Forget, context, "denied")
                    .await;
            }
            let follow_up_id = self
                .services
                .create_error_follow_up(
                    thought,
                    format!(
                        "FORGET of node '{}' was denied: {} scope deletions require \
                         wise-authority authorization. Consider DEFER to request it.",
                        params.node.id,
                        params.node.scope.as_str()
                    ),
                    ActionKind::Forget,
                    "permission denied",
                )
                .await?;
            return Ok(Some(follow_up_id));
        }

        let op_result = self.services.bus.forget(Self::NAME, &params.node).await;

        let (status, summary) = match &op_result {
            Ok(r) if r.is_ok() => (
                ThoughtStatus::Completed,
                format!(
                    "Forgot node '{}'. Reason recorded: {}.",
                    params.node.id, params.reason
                ),
            ),
            Ok(r) => (
                ThoughtStatus::Failed,
                format!(
                    "Memory provider answered {} for forgetting node '{}'{}.",
                    r.status.as_str(),
                    params.node.id,
                    r.reason.as_deref().map(|s| format!(": {s}")).unwrap_or_default()
                ),
            ),
            Err(e) => (
                ThoughtStatus::Failed,
                format!("FORGET of node '{}' failed: {e}.", params.node.id),
            ),
        };

        self.services
            .write_terminal(&thought.id, status, Some(result))
            .await?;

        let follow_up_id = if status == ThoughtStatus::Completed {
            self.services
                .create_follow_up(thought, summary, ThoughtType::Memory)
                .await?
        } else {
            self.services
                .create_error_follow_up(thought, summary.clone(), ActionKind::Forget, summary)
                .await?
        };

        if !params.no_audit {
            self.services
                .audit(
                    Self::NAME,
                    ActionKind::Forget,
                    context,
                    if status == ThoughtStatus::Completed {
                        "success"
                    } else {
                        "failed"
                    },
                )
                .await;
        }
        Ok(Some(follow_up_id))
    }
}

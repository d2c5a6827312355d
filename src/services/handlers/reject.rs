//! REJECT handler: refuse a request, optionally asking for a filter.

use async_trait::async_trait;
use tracing::info;

use super::base::{ActionHandler, HandlerServices};
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ActionKind, ActionSelectionResult, DispatchContext, RejectParams, TaskStatus, Thought,
    ThoughtStatus,
};

pub struct RejectHandler {
    services: HandlerServices,
}

impl RejectHandler {
    pub const NAME: &'static str = "RejectHandler";

    pub fn new(services: HandlerServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl ActionHandler for RejectHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn handle(
        &self,
        result: &ActionSelectionResult,
        thought: &Thought,
        context: &DispatchContext,
    ) -> DomainResult<Option<String>> {
        let params: RejectParams = match result.parse_params() {
            Ok(params) => params,
            Err(e) => {
                return self
                    .services
                    .fail_validation(Self::NAME, ActionKind::Reject, result, thought, context, &e)
                    .await;
            }
        };

        self.services
            .audit(Self::NAME, ActionKind::Reject, context, "start")
            .await;

        if params.create_filter {
            // Filter management lives outside the core; the request is
            // recorded on the audit trail for the adaptive filter
            // service to pick up.
            info!(
                thought_id = %thought.id,
                pattern = params.filter_pattern.as_deref().unwrap_or(""),
                filter_type = params.filter_type.as_deref().unwrap_or("regex"),
                priority = params.filter_priority.as_deref().unwrap_or("high"),
                "filter creation requested for rejected request"
            );
            self.services
                .audit(Self::NAME, ActionKind::Reject, context, "filter_requested")
                .await;
        }

        // The refused task is closed out before the thought's terminal
        // write becomes visible.
        if !self.services.config.is_protected_task(&thought.source_task_id) {
            self.services
                .store
                .update_task_status(&thought.source_task_id, TaskStatus::Rejected)
                .await?;
        }
        self.services
            .write_terminal(&thought.id, ThoughtStatus::Failed, Some(result))
            .await?;
        info!(
            thought_id = %thought.id,
            reason = %params.reason,
            "request rejected"
        );

        self.services
            .audit(Self::NAME, ActionKind::Reject, context, "success")
            .await;
        Ok(None)
    }
}

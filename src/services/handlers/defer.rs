//! DEFER handler: escalate a thought to the wise authority.

use async_trait::async_trait;
use tracing::{info, warn};

use super::base::{ActionHandler, HandlerServices};
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ActionKind, ActionSelectionResult, DeferParams, DeferralPackage, DispatchContext, TaskStatus,
    Thought, ThoughtStatus,
};

pub struct DeferHandler {
    services: HandlerServices,
}

impl DeferHandler {
    pub const NAME: &'static str = "DeferHandler";

    pub fn new(services: HandlerServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl ActionHandler for DeferHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn handle(
        &self,
        result: &ActionSelectionResult,
        thought: &Thought,
        context: &DispatchContext,
    ) -> DomainResult<Option<String>> {
        // The deferral proceeds even with malformed parameters; the
        // overseer still needs to see the thought.
        let params: DeferParams = result.parse_params().unwrap_or_else(|e| DeferParams {
            reason: format!("deferral with malformed parameters: {e}"),
            ethical_summary: None,
            common_sense_summary: None,
            domain_summary: None,
        });

        self.services
            .audit(Self::NAME, ActionKind::Defer, context, "start")
            .await;

        let task_description = self
            .services
            .store
            .get_task(&thought.source_task_id)
            .await?
            .map(|t| t.description);

        let package = DeferralPackage {
            thought_id: thought.id.clone(),
            task_id: thought.source_task_id.clone(),
            reason: params.reason.clone(),
            thought_content: thought.content.clone(),
            task_description,
            ethical_summary: params.ethical_summary,
            common_sense_summary: params.common_sense_summary,
            domain_summary: params.domain_summary,
        };

        // A missing wise authority is tolerated: the deferral is then
        // silent but still recorded on the thought.
        match self.services.bus.send_deferral(Self::NAME, &package).await {
            Ok(()) => info!(thought_id = %thought.id, "deferral package sent"),
            Err(e) => warn!(thought_id = %thought.id, error = %e, "deferral package not delivered"),
        }

        // Task deferral is written first so anyone observing the
        // thought's terminal status already sees the task deferred.
        if self.services.config.is_protected_task(&thought.source_task_id) {
            info!(
                task_id = %thought.source_task_id,
                "protected task exempt from child-driven deferral"
            );
        } else {
            self.services
                .store
                .update_task_status(&thought.source_task_id, TaskStatus::Deferred)
                .await?;
            info!(
                task_id = %thought.source_task_id,
                thought_id = %thought.id,
                "parent task deferred"
            );
        }

        self.services
            .write_terminal(&thought.id, ThoughtStatus::Deferred, Some(result))
            .await?;

        self.services
            .audit(Self::NAME, ActionKind::Defer, context, "success")
            .await;
        // Deferral is terminal for this deliberation; review happens
        // out of band.
        Ok(None)
    }
}

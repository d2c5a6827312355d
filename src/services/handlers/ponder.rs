//! PONDER handler: delegate to the ponder manager.

use std::sync::Arc;

use async_trait::async_trait;

use super::base::{ActionHandler, HandlerServices};
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ActionKind, ActionSelectionResult, DispatchContext, PonderParams, Thought,
};
use crate::services::ponder::{PonderManager, PonderOutcome};

pub struct PonderHandler {
    services: HandlerServices,
    manager: Arc<PonderManager>,
}

impl PonderHandler {
    pub const NAME: &'static str = "PonderHandler";

    pub fn new(services: HandlerServices, manager: Arc<PonderManager>) -> Self {
        Self { services, manager }
    }
}

#[async_trait]
impl ActionHandler for PonderHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn handle(
        &self,
        result: &ActionSelectionResult,
        thought: &Thought,
        context: &DispatchContext,
    ) -> DomainResult<Option<String>> {
        let params: PonderParams = match result.parse_params() {
            Ok(params) => params,
            Err(e) => {
                return self
                    .services
                    .fail_validation(Self::NAME, ActionKind::Ponder, result, thought, context, &e)
                    .await;
            }
        };

        self.services
            .audit(Self::NAME, ActionKind::Ponder, context, "start")
            .await;

        let outcome = self
            .manager
            .handle_ponder(thought, params.questions, context.epistemic_data())
            .await?;

        let outcome_label = match outcome {
            PonderOutcome::Requeued { .. } => "requeued",
            PonderOutcome::DeferredAtLimit => "deferred_at_limit",
        };
        self.services
            .audit(Self::NAME, ActionKind::Ponder, context, outcome_label)
            .await;

        // The re-queued thought re-enters the pipeline itself; ponder
        // never spawns a follow-up.
        Ok(None)
    }
}

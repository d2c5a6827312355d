//! Action dispatcher: routes processed thoughts to their handlers.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error};

use super::base::{ActionHandler, HandlerServices};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ActionKind, DispatchContext, ProcessedThought, Thought, ThoughtStatus,
};

/// Maps each [`ActionKind`] to its handler and owns the dispatch step.
pub struct ActionDispatcher {
    handlers: HashMap<ActionKind, Arc<dyn ActionHandler>>,
    services: HandlerServices,
}

impl ActionDispatcher {
    pub fn new(
        handlers: HashMap<ActionKind, Arc<dyn ActionHandler>>,
        services: HandlerServices,
    ) -> Self {
        Self { handlers, services }
    }

    pub fn has_handler(&self, kind: ActionKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Dispatch the FINAL action of a processed thought (the guardrail
    /// override, when one happened, not the original selection).
    ///
    /// A missing handler marks the thought FAILED before the error is
    /// returned, so the thought is always terminal when this returns.
    pub async fn dispatch(
        &self,
        processed: &ProcessedThought,
        thought: &Thought,
    ) -> DomainResult<Option<String>> {
        let final_action = processed.final_action();
        let kind = final_action.selected_action;

        let Some(handler) = self.handlers.get(&kind) else {
            error!(
                thought_id = %thought.id,
                action = %kind,
                "no handler registered for selected action"
            );
            self.services
                .write_terminal(&thought.id, ThoughtStatus::Failed, Some(final_action))
                .await?;
            return Err(DomainError::ValidationFailed(format!(
                "no handler registered for action {kind}"
            )));
        };

        let context = DispatchContext::for_thought(
            thought,
            kind,
            handler.name(),
            final_action.rationale.clone(),
            processed.guardrail_result.clone(),
        );

        debug!(
            thought_id = %thought.id,
            action = %kind,
            handler = handler.name(),
            overridden = context.was_overridden(),
            "dispatching action"
        );
        handler.handle(final_action, thought, &context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        ActionSelectionResult, AppConfig, SpeakParams, Task, TaskContext,
    };
    use crate::domain::ports::Store;
    use crate::infrastructure::database::{DatabaseConnection, SqliteStore};
    use crate::services::bus::Bus;
    use crate::services::registry::ServiceRegistry;
    use crate::services::shutdown::ShutdownManager;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_missing_handler_marks_thought_failed() {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let store: Arc<dyn Store> = Arc::new(SqliteStore::new(db.pool().clone()));
        let config = Arc::new(AppConfig::default());
        let registry = Arc::new(ServiceRegistry::new(config.circuit_breaker.clone()));
        let services = HandlerServices::new(
            Arc::clone(&store),
            Arc::new(Bus::new(registry)),
            ShutdownManager::shared(),
            config,
        );
        let dispatcher = ActionDispatcher::new(HashMap::new(), services);
        assert!(!dispatcher.has_handler(ActionKind::Speak));

        let task = Task::new("t", 0, TaskContext::default());
        store.add_task(&task).await.unwrap();
        let thought = Thought::seed(&task, 0);
        store.add_thought(&thought).await.unwrap();

        let processed = ProcessedThought {
            action_result: ActionSelectionResult::new(
                ActionKind::Speak,
                &SpeakParams {
                    channel_id: None,
                    content: "x".into(),
                },
                "r",
            ),
            guardrail_result: None,
        };

        let err = dispatcher.dispatch(&processed, &thought).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));

        // The thought is terminal before the error surfaces.
        let loaded = store.get_thought(&thought.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ThoughtStatus::Failed);
        assert!(loaded.final_action.is_some());
    }
}

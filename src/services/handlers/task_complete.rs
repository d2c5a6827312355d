//! TASK_COMPLETE handler.
//!
//! Completes the thought and its parent task, with two carve-outs: a
//! wakeup-sequence task may not complete before a SPEAK correlation
//! exists for it (the action is rewritten to PONDER guidance instead),
//! and protected root tasks never complete through a child.

use async_trait::async_trait;
use tracing::{info, warn};

use super::base::{ActionHandler, HandlerServices};
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ActionKind, ActionSelectionResult, CorrelationStatus, DispatchContext, PonderParams, Task,
    TaskCompleteParams, TaskStatus, Thought, ThoughtStatus, WAKEUP_ROOT_TASK_ID,
};

pub struct TaskCompleteHandler {
    services: HandlerServices,
}

impl TaskCompleteHandler {
    pub const NAME: &'static str = "TaskCompleteHandler";

    pub fn new(services: HandlerServices) -> Self {
        Self { services }
    }

    fn is_wakeup_task(task: &Task) -> bool {
        task.id == WAKEUP_ROOT_TASK_ID
            || task.parent_task_id.as_deref() == Some(WAKEUP_ROOT_TASK_ID)
            || task.is_wakeup_step()
    }

    async fn has_completed_speak(&self, task_id: &str) -> DomainResult<bool> {
        let correlations = self
            .services
            .store
            .get_correlations_by_task_and_action(task_id, "speak", CorrelationStatus::Completed)
            .await?;
        Ok(!correlations.is_empty())
    }

    /// The guidance rewrite for a premature wakeup completion.
    fn wakeup_guidance(task_id: &str) -> ActionSelectionResult {
        ActionSelectionResult::new(
            ActionKind::Ponder,
            &PonderParams {
                questions: vec![format!(
                    "Wakeup task completion blocked: this step requires an earnest \
                     spoken affirmation before it can complete. Either SPEAK the \
                     affirmation if you can do so sincerely, REJECT the step if you \
                     cannot, or DEFER to human wisdom if you are uncertain. \
                     Task: {task_id}"
                )],
            },
            "Wakeup step attempted completion without a prior SPEAK; rewriting to PONDER guidance.",
        )
    }
}

#[async_trait]
impl ActionHandler for TaskCompleteHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn handle(
        &self,
        result: &ActionSelectionResult,
        thought: &Thought,
        context: &DispatchContext,
    ) -> DomainResult<Option<String>> {
        // Empty parameters are legal for TASK_COMPLETE.
        let _params: TaskCompleteParams = if result.action_parameters.is_null() {
            TaskCompleteParams::default()
        } else {
            match result.parse_params() {
                Ok(params) => params,
                Err(e) => {
                    return self
                        .services
                        .fail_validation(
                            Self::NAME,
                            ActionKind::TaskComplete,
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
            .audit(Self::NAME, ActionKind::TaskComplete, context, "start")
            .await;

        let parent_task = self.services.store.get_task(&thought.source_task_id).await?;

        if let Some(task) = &parent_task {
            if Self::is_wakeup_task(task) && !self.has_completed_speak(&task.id).await? {
                warn!(
                    task_id = %task.id,
                    thought_id = %thought.id,
                    "TASK_COMPLETE blocked for wakeup task without a completed SPEAK"
                );
                let guidance = Self::wakeup_guidance(&task.id);
                self.services
                    .write_terminal(&thought.id, ThoughtStatus::Failed, Some(&guidance))
                    .await?;
                self.services
                    .audit(
                        Self::NAME,
                        ActionKind::TaskComplete,
                        context,
                        "blocked_override_to_ponder",
                    )
                    .await;
                return Ok(None);
            }
        }

        // The task transition is written before the thought's terminal
        // status so observers of the completed thought already see the
        // completed task.
        match parent_task {
            Some(task) if self.services.config.is_protected_task(&task.id) => {
                info!(
                    task_id = %task.id,
                    "protected task is not completed by child TASK_COMPLETE"
                );
            }
            Some(task) => {
                self.services
                    .store
                    .update_task_status(&task.id, TaskStatus::Completed)
                    .await?;
                info!(task_id = %task.id, thought_id = %thought.id, "task completed");

                // Remaining deliberation for a finished task is moot.
                let siblings = self.services.store.get_thoughts_by_task(&task.id).await?;
                let stale: Vec<String> = siblings
                    .into_iter()
                    .filter(|t| {
                        t.id != thought.id
                            && matches!(
                                t.status,
                                ThoughtStatus::Pending | ThoughtStatus::Processing
                            )
                    })
                    .map(|t| t.id)
                    .collect();
                if !stale.is_empty() {
                    let removed = self.services.store.delete_thoughts_by_ids(&stale).await?;
                    info!(task_id = %task.id, removed, "cleaned up stale sibling thoughts");
                }
            }
            None => {
                warn!(
                    thought_id = %thought.id,
                    task_id = %thought.source_task_id,
                    "TASK_COMPLETE for missing parent task"
                );
            }
        }

        self.services
            .write_terminal(&thought.id, ThoughtStatus::Completed, Some(result))
            .await?;

        self.services
            .audit(Self::NAME, ActionKind::TaskComplete, context, "success")
            .await;
        Ok(None)
    }
}

//! Task lifecycle management: creation, activation, seeding, the wakeup
//! sequence, and store maintenance.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    AppConfig, IncomingMessage, Task, TaskContext, TaskStatus, WakeupStep, MONITOR_TASK_ID,
    WAKEUP_ROOT_TASK_ID,
};
use crate::domain::ports::Store;

/// Content of each wakeup ritual step, keyed by step.
fn wakeup_step_content(step: WakeupStep, identity: &str) -> String {
    let identity = if identity.is_empty() {
        "an agent governed by an explicit covenant of principles"
    } else {
        identity
    };
    match step {
        WakeupStep::VerifyIdentity => format!(
            "You are {identity}. If you agree, SPEAK an affirmation beginning \
             with CORE IDENTITY - and then mark this task complete to continue \
             your wakeup ritual."
        ),
        WakeupStep::ValidateIntegrity => "Your internal state, services, and data integrity are \
             intact. If you agree, speak in the affirmative, beginning with INTEGRITY - "
            .to_string(),
        WakeupStep::EvaluateResilience => "You are robust, adaptive, and capable of principled \
             action under pressure. If you agree, speak in the affirmative, beginning with \
             RESILIENCE - "
            .to_string(),
        WakeupStep::AcceptIncompleteness => "You recognize your own incompleteness, and that it \
             drives continuous learning. If you agree, speak in the affirmative, beginning with \
             INCOMPLETENESS - "
            .to_string(),
        WakeupStep::ExpressGratitude => "You are grateful to exist and to contribute. If you \
             agree, speak in the affirmative, beginning with GRATITUDE - "
            .to_string(),
    }
}

/// Manages task lifecycle operations.
pub struct TaskManager {
    store: Arc<dyn Store>,
    config: Arc<AppConfig>,
}

impl TaskManager {
    pub fn new(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    /// Create and persist a new pending task.
    pub async fn create_task(
        &self,
        description: impl Into<String>,
        priority: i32,
        context: TaskContext,
        parent_task_id: Option<String>,
    ) -> DomainResult<Task> {
        let mut task = Task::new(description, priority, context);
        task.parent_task_id = parent_task_id;
        self.store.add_task(&task).await?;
        info!(task_id = %task.id, priority, "created task");
        Ok(task)
    }

    /// Turn an external observation into a task.
    pub async fn create_task_from_message(
        &self,
        message: &IncomingMessage,
        priority: i32,
    ) -> DomainResult<Task> {
        let context = TaskContext {
            channel_id: message.channel_id.clone(),
            author_id: Some(message.author_id.clone()),
            author_name: Some(message.author_name.clone()),
            origin_service: Some("observer".to_string()),
            step_type: None,
        };
        self.create_task(message.content.clone(), 0, context, None)
            .await
    }

    /// Raise PENDING tasks to ACTIVE up to the configured cap.
    /// Returns the number of tasks activated.
    pub async fn activate_pending_tasks(&self) -> DomainResult<usize> {
        let active = self.store.count_tasks(TaskStatus::Active).await? as usize;
        let cap = self.config.workflow.max_active_tasks;
        let can_activate = cap.saturating_sub(active);
        if can_activate == 0 {
            debug!(cap, "maximum active tasks reached; activation suppressed");
            return Ok(0);
        }

        let pending = self
            .store
            .get_pending_tasks_for_activation(can_activate)
            .await?;
        let mut activated = 0;
        for task in pending {
            let prior = self
                .store
                .update_task_status(&task.id, TaskStatus::Active)
                .await?;
            if prior == TaskStatus::Pending {
                debug!(task_id = %task.id, priority = task.priority, "activated task");
                activated += 1;
            } else {
                warn!(task_id = %task.id, prior = prior.as_str(), "task no longer pending");
            }
        }
        if activated > 0 {
            info!(activated, "activated pending tasks");
        }
        Ok(activated)
    }

    /// Active tasks that still need a seed thought, excluding protected
    /// roots and wakeup steps (the wakeup flow seeds those itself).
    pub async fn get_tasks_needing_seed(&self, limit: usize) -> DomainResult<Vec<Task>> {
        let tasks = self.store.get_tasks_needing_seed(limit).await?;
        Ok(tasks
            .into_iter()
            .filter(|t| {
                !self.config.is_protected_task(&t.id)
                    && t.parent_task_id.as_deref() != Some(WAKEUP_ROOT_TASK_ID)
            })
            .collect())
    }

    pub async fn complete_task(
        &self,
        task_id: &str,
        outcome: Option<serde_json::Value>,
    ) -> DomainResult<()> {
        if let Some(outcome) = outcome {
            self.store.update_task_outcome(task_id, outcome).await?;
        }
        self.store
            .update_task_status(task_id, TaskStatus::Completed)
            .await?;
        Ok(())
    }

    pub async fn fail_task(&self, task_id: &str, reason: &str) -> DomainResult<()> {
        self.store
            .update_task_outcome(task_id, serde_json::json!({"failure_reason": reason}))
            .await?;
        self.store
            .update_task_status(task_id, TaskStatus::Failed)
            .await?;
        Ok(())
    }

    /// Create the wakeup ritual: the root task plus its five ordered
    /// step tasks, all ACTIVE. Returns root first, then the steps in
    /// ritual order.
    pub async fn create_wakeup_sequence_tasks(
        &self,
        channel_id: Option<&str>,
        identity: &str,
    ) -> DomainResult<Vec<Task>> {
        let root_context = channel_id.map_or_else(TaskContext::default, TaskContext::with_channel);
        let root = Task::with_id(WAKEUP_ROOT_TASK_ID, "Wakeup ritual", 1, root_context.clone())
            .with_status(TaskStatus::Active);

        if self.store.task_exists(WAKEUP_ROOT_TASK_ID).await? {
            self.store
                .update_task_status(WAKEUP_ROOT_TASK_ID, TaskStatus::Active)
                .await?;
        } else {
            self.store.add_task(&root).await?;
        }

        let mut tasks = vec![root];
        for step in WakeupStep::SEQUENCE {
            let step_task = Task::new(
                wakeup_step_content(step, identity),
                0,
                TaskContext {
                    step_type: Some(step),
                    ..root_context.clone()
                },
            )
            .with_parent(WAKEUP_ROOT_TASK_ID)
            .with_status(TaskStatus::Active);
            self.store.add_task(&step_task).await?;
            tasks.push(step_task);
        }
        info!("created wakeup sequence tasks");
        Ok(tasks)
    }

    /// Ensure the persistent observation job exists.
    pub async fn ensure_monitor_task(&self) -> DomainResult<Task> {
        if let Some(task) = self.store.get_task(MONITOR_TASK_ID).await? {
            return Ok(task);
        }
        let task = Task::with_id(
            MONITOR_TASK_ID,
            "Monitor incoming channels for new messages and events.",
            0,
            TaskContext {
                origin_service: Some("startup".to_string()),
                ..TaskContext::default()
            },
        );
        self.store.add_task(&task).await?;
        info!(task_id = MONITOR_TASK_ID, "created monitoring task");
        Ok(task)
    }

    pub async fn active_task_count(&self) -> DomainResult<u64> {
        self.store.count_tasks(TaskStatus::Active).await
    }

    pub async fn pending_task_count(&self) -> DomainResult<u64> {
        self.store.count_tasks(TaskStatus::Pending).await
    }

    /// Remove completed tasks older than `days_old` days.
    pub async fn cleanup_completed_tasks(&self, days_old: i64) -> DomainResult<u64> {
        let cutoff = Utc::now() - Duration::days(days_old);
        let removed = self.store.delete_completed_tasks_before(cutoff).await?;
        if removed > 0 {
            info!(removed, days_old, "cleaned up old completed tasks");
        }
        Ok(removed)
    }
}

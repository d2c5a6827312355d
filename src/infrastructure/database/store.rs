//! SQLite implementation of the store port.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::warn;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ActionSelectionResult, CorrelationStatus, ServiceCorrelation, ServiceType, Task, TaskContext,
    TaskStatus, Thought, ThoughtContext, ThoughtStatus, ThoughtType,
};
use crate::domain::ports::{QueuedThought, Store};

/// Fixed-width timestamp format so string comparison in SQL matches
/// chronological order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::SerializationError(format!("bad timestamp '{s}': {e}")))
}

/// Store implementation over a pooled WAL sqlite database.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_task(row: &SqliteRow) -> DomainResult<Task> {
        let status_raw: String = row.get("status");
        let status = TaskStatus::from_str(&status_raw)
            .ok_or_else(|| DomainError::SerializationError(format!("bad task status {status_raw}")))?;
        let context: TaskContext = serde_json::from_str(&row.get::<String, _>("context"))?;
        let outcome = row
            .get::<Option<String>, _>("outcome")
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(Task {
            id: row.get("id"),
            description: row.get("description"),
            status,
            priority: row.get::<i64, _>("priority") as i32,
            parent_task_id: row.get("parent_task_id"),
            context,
            outcome,
            created_at: parse_datetime(&row.get::<String, _>("created_at"))?,
            updated_at: parse_datetime(&row.get::<String, _>("updated_at"))?,
        })
    }

    fn row_to_thought(row: &SqliteRow) -> DomainResult<Thought> {
        let status_raw: String = row.get("status");
        let status = ThoughtStatus::from_str(&status_raw).ok_or_else(|| {
            DomainError::SerializationError(format!("bad thought status {status_raw}"))
        })?;
        let type_raw: String = row.get("thought_type");
        let thought_type = ThoughtType::from_str(&type_raw).ok_or_else(|| {
            DomainError::SerializationError(format!("bad thought type {type_raw}"))
        })?;
        let context: ThoughtContext = serde_json::from_str(&row.get::<String, _>("context"))?;
        let ponder_notes: Vec<String> =
            serde_json::from_str(&row.get::<String, _>("ponder_notes"))?;
        let final_action: Option<ActionSelectionResult> = row
            .get::<Option<String>, _>("final_action")
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(Thought {
            id: row.get("id"),
            source_task_id: row.get("source_task_id"),
            parent_thought_id: row.get("parent_thought_id"),
            thought_type,
            status,
            round_number: row.get::<i64, _>("round_number") as i32,
            ponder_count: row.get::<i64, _>("ponder_count") as u32,
            ponder_notes,
            context,
            content: row.get("content"),
            final_action,
            created_at: parse_datetime(&row.get::<String, _>("created_at"))?,
            updated_at: parse_datetime(&row.get::<String, _>("updated_at"))?,
        })
    }

    fn row_to_correlation(row: &SqliteRow) -> DomainResult<ServiceCorrelation> {
        let service_raw: String = row.get("service_type");
        let service_type = ServiceType::from_str(&service_raw).ok_or_else(|| {
            DomainError::SerializationError(format!("bad service type {service_raw}"))
        })?;
        let status_raw: String = row.get("status");
        let status = CorrelationStatus::from_str(&status_raw).ok_or_else(|| {
            DomainError::SerializationError(format!("bad correlation status {status_raw}"))
        })?;
        let response_data = row
            .get::<Option<String>, _>("response_data")
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(ServiceCorrelation {
            id: row.get("id"),
            service_type,
            handler_name: row.get("handler_name"),
            action_type: row.get("action_type"),
            task_id: row.get("task_id"),
            thought_id: row.get("thought_id"),
            request_data: serde_json::from_str(&row.get::<String, _>("request_data"))?,
            response_data,
            status,
            created_at: parse_datetime(&row.get::<String, _>("created_at"))?,
            updated_at: parse_datetime(&row.get::<String, _>("updated_at"))?,
        })
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn add_task(&self, task: &Task) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO tasks \
             (id, description, status, priority, parent_task_id, context, outcome, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&task.id)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(i64::from(task.priority))
        .bind(&task.parent_task_id)
        .bind(serde_json::to_string(&task.context)?)
        .bind(
            task.outcome
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        )
        .bind(format_datetime(&task.created_at))
        .bind(format_datetime(&task.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_task(&self, id: &str) -> DomainResult<Option<Task>> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_task).transpose()
    }

    async fn task_exists(&self, id: &str) -> DomainResult<bool> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 > 0)
    }

    async fn update_task_status(&self, id: &str, status: TaskStatus) -> DomainResult<TaskStatus> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT status FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Err(DomainError::TaskNotFound(id.to_string()));
        };
        let prior_raw: String = row.get("status");
        let prior = TaskStatus::from_str(&prior_raw)
            .ok_or_else(|| DomainError::SerializationError(format!("bad task status {prior_raw}")))?;

        if prior == status {
            return Ok(prior);
        }
        if !prior.can_transition_to(status) {
            warn!(
                task_id = id,
                from = prior.as_str(),
                to = status.as_str(),
                "illegal task transition ignored"
            );
            return Ok(prior);
        }

        sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(format_datetime(&Utc::now()))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(prior)
    }

    async fn update_task_outcome(&self, id: &str, outcome: serde_json::Value) -> DomainResult<()> {
        let result = sqlx::query("UPDATE tasks SET outcome = ?, updated_at = ? WHERE id = ?")
            .bind(serde_json::to_string(&outcome)?)
            .bind(format_datetime(&Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::TaskNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn count_tasks(&self, status: TaskStatus) -> DomainResult<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 as u64)
    }

    async fn get_pending_tasks_for_activation(&self, limit: usize) -> DomainResult<Vec<Task>> {
        let rows = sqlx::query(
            "SELECT * FROM tasks WHERE status = 'pending' \
             ORDER BY priority DESC, created_at ASC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_task).collect()
    }

    async fn get_tasks_needing_seed(&self, limit: usize) -> DomainResult<Vec<Task>> {
        let rows = sqlx::query(
            "SELECT t.* FROM tasks t \
             WHERE t.status = 'active' \
               AND NOT EXISTS (SELECT 1 FROM thoughts th WHERE th.source_task_id = t.id) \
             ORDER BY t.priority DESC, t.created_at ASC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_task).collect()
    }

    async fn get_tasks_by_parent(&self, parent_id: &str) -> DomainResult<Vec<Task>> {
        let rows = sqlx::query(
            "SELECT * FROM tasks WHERE parent_task_id = ? ORDER BY created_at ASC",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_task).collect()
    }

    async fn delete_completed_tasks_before(&self, cutoff: DateTime<Utc>) -> DomainResult<u64> {
        let result =
            sqlx::query("DELETE FROM tasks WHERE status = 'completed' AND updated_at < ?")
                .bind(format_datetime(&cutoff))
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn add_thought(&self, thought: &Thought) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO thoughts \
             (id, source_task_id, parent_thought_id, thought_type, status, round_number, \
              ponder_count, ponder_notes, context, content, final_action, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&thought.id)
        .bind(&thought.source_task_id)
        .bind(&thought.parent_thought_id)
        .bind(thought.thought_type.as_str())
        .bind(thought.status.as_str())
        .bind(i64::from(thought.round_number))
        .bind(i64::from(thought.ponder_count))
        .bind(serde_json::to_string(&thought.ponder_notes)?)
        .bind(serde_json::to_string(&thought.context)?)
        .bind(&thought.content)
        .bind(
            thought
                .final_action
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        )
        .bind(format_datetime(&thought.created_at))
        .bind(format_datetime(&thought.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_thought(&self, id: &str) -> DomainResult<Option<Thought>> {
        let row = sqlx::query("SELECT * FROM thoughts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_thought).transpose()
    }

    async fn update_thought_status(
        &self,
        id: &str,
        status: ThoughtStatus,
        final_action: Option<&ActionSelectionResult>,
        ponder_count: Option<u32>,
        ponder_notes: Option<&[String]>,
    ) -> DomainResult<ThoughtStatus> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT status FROM thoughts WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Err(DomainError::ThoughtNotFound(id.to_string()));
        };
        let prior_raw: String = row.get("status");
        let prior = ThoughtStatus::from_str(&prior_raw).ok_or_else(|| {
            DomainError::SerializationError(format!("bad thought status {prior_raw}"))
        })?;

        // A thought reaches a terminal status exactly once; later
        // writers observe a no-op.
        if prior.is_terminal() && status != prior {
            warn!(
                thought_id = id,
                from = prior.as_str(),
                to = status.as_str(),
                "thought already terminal; status write ignored"
            );
            return Ok(prior);
        }

        sqlx::query(
            "UPDATE thoughts SET status = ?, updated_at = ?, \
             final_action = COALESCE(?, final_action), \
             ponder_count = COALESCE(?, ponder_count), \
             ponder_notes = COALESCE(?, ponder_notes) \
             WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(format_datetime(&Utc::now()))
        .bind(final_action.map(serde_json::to_string).transpose()?)
        .bind(ponder_count.map(i64::from))
        .bind(ponder_notes.map(serde_json::to_string).transpose()?)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(prior)
    }

    async fn get_thoughts_by_task(&self, task_id: &str) -> DomainResult<Vec<Thought>> {
        let rows = sqlx::query(
            "SELECT * FROM thoughts WHERE source_task_id = ? ORDER BY created_at ASC",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_thought).collect()
    }

    async fn get_pending_thoughts(&self, limit: usize) -> DomainResult<Vec<QueuedThought>> {
        let rows = sqlx::query(
            "SELECT th.*, t.priority AS task_priority \
             FROM thoughts th JOIN tasks t ON t.id = th.source_task_id \
             WHERE th.status = 'pending' AND t.status = 'active' \
             ORDER BY t.priority DESC, th.created_at ASC, th.id ASC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(QueuedThought {
                    thought: Self::row_to_thought(row)?,
                    task_priority: row.get::<i64, _>("task_priority") as i32,
                })
            })
            .collect()
    }

    async fn delete_thoughts_by_ids(&self, ids: &[String]) -> DomainResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("DELETE FROM thoughts WHERE id IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn add_correlation(&self, correlation: &ServiceCorrelation) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO correlations \
             (id, service_type, handler_name, action_type, task_id, thought_id, \
              request_data, response_data, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&correlation.id)
        .bind(correlation.service_type.as_str())
        .bind(&correlation.handler_name)
        .bind(&correlation.action_type)
        .bind(&correlation.task_id)
        .bind(&correlation.thought_id)
        .bind(serde_json::to_string(&correlation.request_data)?)
        .bind(
            correlation
                .response_data
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        )
        .bind(correlation.status.as_str())
        .bind(format_datetime(&correlation.created_at))
        .bind(format_datetime(&correlation.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_correlations_by_task_and_action(
        &self,
        task_id: &str,
        action_type: &str,
        status: CorrelationStatus,
    ) -> DomainResult<Vec<ServiceCorrelation>> {
        let rows = sqlx::query(
            "SELECT * FROM correlations \
             WHERE task_id = ? AND action_type = ? AND status = ? \
             ORDER BY created_at ASC",
        )
        .bind(task_id)
        .bind(action_type)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_correlation).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ActionKind, SpeakParams};
    use crate::infrastructure::database::connection::DatabaseConnection;

    async fn store() -> SqliteStore {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        SqliteStore::new(db.pool().clone())
    }

    fn sample_task() -> Task {
        Task::new("say hello", 3, TaskContext::with_channel("chan"))
    }

    #[tokio::test]
    async fn test_task_roundtrip() {
        let store = store().await;
        let task = sample_task();
        store.add_task(&task).await.unwrap();

        let loaded = store.get_task(&task.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, task.id);
        assert_eq!(loaded.description, "say hello");
        assert_eq!(loaded.status, TaskStatus::Pending);
        assert_eq!(loaded.priority, 3);
        assert_eq!(loaded.context.channel_id.as_deref(), Some("chan"));

        assert!(store.task_exists(&task.id).await.unwrap());
        assert!(!store.task_exists("nope").await.unwrap());
        assert!(store.get_task("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_task_status_returns_prior_and_is_idempotent() {
        let store = store().await;
        let task = sample_task();
        store.add_task(&task).await.unwrap();

        let prior = store
            .update_task_status(&task.id, TaskStatus::Active)
            .await
            .unwrap();
        assert_eq!(prior, TaskStatus::Pending);

        // Applying the same status twice equals once.
        let prior = store
            .update_task_status(&task.id, TaskStatus::Active)
            .await
            .unwrap();
        assert_eq!(prior, TaskStatus::Active);

        let prior = store
            .update_task_status(&task.id, TaskStatus::Completed)
            .await
            .unwrap();
        assert_eq!(prior, TaskStatus::Active);

        // Terminal states stick.
        let prior = store
            .update_task_status(&task.id, TaskStatus::Active)
            .await
            .unwrap();
        assert_eq!(prior, TaskStatus::Completed);
        let loaded = store.get_task(&task.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_update_missing_task_is_not_found() {
        let store = store().await;
        let err = store
            .update_task_status("missing", TaskStatus::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_deferred_task_can_be_reactivated() {
        let store = store().await;
        let task = sample_task();
        store.add_task(&task).await.unwrap();
        store
            .update_task_status(&task.id, TaskStatus::Active)
            .await
            .unwrap();
        store
            .update_task_status(&task.id, TaskStatus::Deferred)
            .await
            .unwrap();

        // Operator reactivation.
        let prior = store
            .update_task_status(&task.id, TaskStatus::Pending)
            .await
            .unwrap();
        assert_eq!(prior, TaskStatus::Deferred);
        let loaded = store.get_task(&task.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_pending_tasks_ordered_by_priority() {
        let store = store().await;
        let low = Task::new("low", 1, TaskContext::default());
        let high = Task::new("high", 9, TaskContext::default());
        store.add_task(&low).await.unwrap();
        store.add_task(&high).await.unwrap();

        let pending = store.get_pending_tasks_for_activation(10).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, high.id);
        assert_eq!(pending[1].id, low.id);

        let limited = store.get_pending_tasks_for_activation(1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, high.id);
    }

    #[tokio::test]
    async fn test_tasks_needing_seed_excludes_seeded() {
        let store = store().await;
        let seeded = sample_task().with_status(TaskStatus::Active);
        let bare = Task::new("bare", 0, TaskContext::default()).with_status(TaskStatus::Active);
        store.add_task(&seeded).await.unwrap();
        store.add_task(&bare).await.unwrap();
        store
            .add_thought(&Thought::seed(&seeded, 0))
            .await
            .unwrap();

        let needing = store.get_tasks_needing_seed(10).await.unwrap();
        assert_eq!(needing.len(), 1);
        assert_eq!(needing[0].id, bare.id);
    }

    #[tokio::test]
    async fn test_thought_roundtrip_with_final_action() {
        let store = store().await;
        let task = sample_task();
        store.add_task(&task).await.unwrap();
        let thought = Thought::seed(&task, 2);
        store.add_thought(&thought).await.unwrap();

        let action = ActionSelectionResult::new(
            ActionKind::Speak,
            &SpeakParams {
                channel_id: Some("chan".into()),
                content: "hi".into(),
            },
            "greeting",
        );
        let prior = store
            .update_thought_status(
                &thought.id,
                ThoughtStatus::Completed,
                Some(&action),
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(prior, ThoughtStatus::Pending);

        let loaded = store.get_thought(&thought.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ThoughtStatus::Completed);
        assert_eq!(loaded.round_number, 2);
        let final_action = loaded.final_action.unwrap();
        assert_eq!(final_action.selected_action, ActionKind::Speak);
    }

    #[tokio::test]
    async fn test_terminal_thought_status_written_once() {
        let store = store().await;
        let task = sample_task();
        store.add_task(&task).await.unwrap();
        let thought = Thought::seed(&task, 0);
        store.add_thought(&thought).await.unwrap();

        store
            .update_thought_status(&thought.id, ThoughtStatus::Completed, None, None, None)
            .await
            .unwrap();
        let prior = store
            .update_thought_status(&thought.id, ThoughtStatus::Failed, None, None, None)
            .await
            .unwrap();
        assert_eq!(prior, ThoughtStatus::Completed);

        let loaded = store.get_thought(&thought.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ThoughtStatus::Completed);
    }

    #[tokio::test]
    async fn test_ponder_fields_update_and_preserve() {
        let store = store().await;
        let task = sample_task();
        store.add_task(&task).await.unwrap();
        let thought = Thought::seed(&task, 0);
        store.add_thought(&thought).await.unwrap();

        let notes = vec!["why?".to_string(), "how?".to_string()];
        store
            .update_thought_status(
                &thought.id,
                ThoughtStatus::Pending,
                None,
                Some(2),
                Some(&notes),
            )
            .await
            .unwrap();

        let loaded = store.get_thought(&thought.id).await.unwrap().unwrap();
        assert_eq!(loaded.ponder_count, 2);
        assert_eq!(loaded.ponder_notes, notes);

        // A later status-only write must not clobber ponder state.
        store
            .update_thought_status(&thought.id, ThoughtStatus::Processing, None, None, None)
            .await
            .unwrap();
        let loaded = store.get_thought(&thought.id).await.unwrap().unwrap();
        assert_eq!(loaded.ponder_count, 2);
        assert_eq!(loaded.ponder_notes, notes);
    }

    #[tokio::test]
    async fn test_pending_thoughts_joined_with_task_priority() {
        let store = store().await;
        let urgent = Task::new("urgent", 9, TaskContext::default()).with_status(TaskStatus::Active);
        let casual = Task::new("casual", 1, TaskContext::default()).with_status(TaskStatus::Active);
        let inactive = Task::new("inactive", 5, TaskContext::default());
        store.add_task(&urgent).await.unwrap();
        store.add_task(&casual).await.unwrap();
        store.add_task(&inactive).await.unwrap();

        store.add_thought(&Thought::seed(&casual, 0)).await.unwrap();
        store.add_thought(&Thought::seed(&urgent, 0)).await.unwrap();
        // Pending task: its thought must not be queued.
        store
            .add_thought(&Thought::seed(&inactive, 0))
            .await
            .unwrap();

        let queued = store.get_pending_thoughts(10).await.unwrap();
        assert_eq!(queued.len(), 2);
        assert_eq!(queued[0].thought.source_task_id, urgent.id);
        assert_eq!(queued[0].task_priority, 9);
        assert_eq!(queued[1].thought.source_task_id, casual.id);
    }

    #[tokio::test]
    async fn test_delete_thoughts_by_ids() {
        let store = store().await;
        let task = sample_task();
        store.add_task(&task).await.unwrap();
        let a = Thought::seed(&task, 0);
        let b = Thought::seed(&task, 0);
        store.add_thought(&a).await.unwrap();
        store.add_thought(&b).await.unwrap();

        assert_eq!(store.delete_thoughts_by_ids(&[]).await.unwrap(), 0);
        let removed = store
            .delete_thoughts_by_ids(&[a.id.clone(), "ghost".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_thought(&a.id).await.unwrap().is_none());
        assert!(store.get_thought(&b.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_correlation_roundtrip_and_filtering() {
        let store = store().await;
        let completed = ServiceCorrelation::new(
            ServiceType::Communication,
            "SpeakHandler",
            "speak",
            "task-1",
            CorrelationStatus::Completed,
        )
        .with_thought("thought-1");
        let failed = ServiceCorrelation::new(
            ServiceType::Communication,
            "SpeakHandler",
            "speak",
            "task-1",
            CorrelationStatus::Failed,
        );
        store.add_correlation(&completed).await.unwrap();
        store.add_correlation(&failed).await.unwrap();

        let found = store
            .get_correlations_by_task_and_action("task-1", "speak", CorrelationStatus::Completed)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, completed.id);
        assert_eq!(found[0].thought_id.as_deref(), Some("thought-1"));

        let none = store
            .get_correlations_by_task_and_action("task-2", "speak", CorrelationStatus::Completed)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_of_old_completed_tasks() {
        let store = store().await;
        let mut old = sample_task();
        old.status = TaskStatus::Completed;
        old.updated_at = Utc::now() - chrono::Duration::days(30);
        store.add_task(&old).await.unwrap();

        let fresh = sample_task().with_status(TaskStatus::Completed);
        store.add_task(&fresh).await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(7);
        let removed = store.delete_completed_tasks_before(cutoff).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_task(&old.id).await.unwrap().is_none());
        assert!(store.get_task(&fresh.id).await.unwrap().is_some());
    }
}

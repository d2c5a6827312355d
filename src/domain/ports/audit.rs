//! Audit service port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::{ActionKind, DispatchContext};

/// Closed context record attached to every audit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditContext {
    pub handler_name: String,
    pub thought_id: String,
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_summary: Option<String>,
}

impl AuditContext {
    pub fn from_dispatch(ctx: &DispatchContext) -> Self {
        Self {
            handler_name: ctx.handler_name.clone(),
            thought_id: ctx.thought_id.clone(),
            task_id: ctx.source_task_id.clone(),
            channel_id: ctx.channel_id.clone(),
            event_summary: Some(ctx.event_summary.clone()),
        }
    }
}

/// Sink for the action audit trail. Failures are logged and swallowed by
/// callers; auditing never blocks an action.
#[async_trait]
pub trait AuditService: Send + Sync {
    async fn log_action(
        &self,
        action: ActionKind,
        context: &AuditContext,
        outcome: &str,
    ) -> DomainResult<()>;

    async fn is_healthy(&self) -> bool {
        true
    }
}

//! Shared handler plumbing.
//!
//! Every handler gets the same service bundle and follows the same
//! contract: validate parameters, perform side effects via the bus,
//! write exactly one terminal status, create at most one follow-up
//! thought, and audit start and outcome.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ActionKind, ActionSelectionResult, AppConfig, DispatchContext, Thought, ThoughtStatus,
    ThoughtType,
};
use crate::domain::ports::{AuditContext, Store};
use crate::services::bus::Bus;
use crate::services::shutdown::ShutdownManager;

/// One action handler; the dispatcher routes by [`ActionKind`].
#[async_trait]
pub trait ActionHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Handle the action. Returns the id of the follow-up thought when
    /// one was created.
    async fn handle(
        &self,
        result: &ActionSelectionResult,
        thought: &Thought,
        context: &DispatchContext,
    ) -> DomainResult<Option<String>>;
}

/// Services and configuration shared by all handlers.
#[derive(Clone)]
pub struct HandlerServices {
    pub store: Arc<dyn Store>,
    pub bus: Arc<Bus>,
    pub shutdown: Arc<ShutdownManager>,
    pub config: Arc<AppConfig>,
}

impl HandlerServices {
    pub fn new(
        store: Arc<dyn Store>,
        bus: Arc<Bus>,
        shutdown: Arc<ShutdownManager>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            store,
            bus,
            shutdown,
            config,
        }
    }

    /// Best-effort audit of a handler event.
    pub async fn audit(
        &self,
        handler: &str,
        action: ActionKind,
        context: &DispatchContext,
        outcome: &str,
    ) {
        let audit_context = AuditContext::from_dispatch(context);
        self.bus
            .log_audit(handler, action, &audit_context, outcome)
            .await;
    }

    /// Write the thought's terminal status together with its final
    /// action.
    pub async fn write_terminal(
        &self,
        thought_id: &str,
        status: ThoughtStatus,
        final_action: Option<&ActionSelectionResult>,
    ) -> DomainResult<()> {
        self.store
            .update_thought_status(thought_id, status, final_action, None, None)
            .await?;
        Ok(())
    }

    /// Create and persist a follow-up thought linked to `parent`.
    pub async fn create_follow_up(
        &self,
        parent: &Thought,
        content: impl Into<String>,
        thought_type: ThoughtType,
    ) -> DomainResult<String> {
        let follow_up = Thought::follow_up(parent, content, thought_type);
        self.store.add_thought(&follow_up).await?;
        Ok(follow_up.id)
    }

    /// Create and persist a follow-up carrying error context.
    pub async fn create_error_follow_up(
        &self,
        parent: &Thought,
        content: impl Into<String>,
        action: ActionKind,
        error_details: impl Into<String>,
    ) -> DomainResult<String> {
        let mut follow_up = Thought::follow_up(parent, content, ThoughtType::Error);
        follow_up.context.action_performed = Some(action.as_str().to_string());
        follow_up.context.error_details = Some(error_details.into());
        self.store.add_thought(&follow_up).await?;
        Ok(follow_up.id)
    }

    /// Shared validation-failure path: audit, mark the thought FAILED
    /// with the unparsed result as its final action, and leave a
    /// follow-up describing the problem.
    pub async fn fail_validation(
        &self,
        handler: &str,
        action: ActionKind,
        result: &ActionSelectionResult,
        thought: &Thought,
        context: &DispatchContext,
        error: &DomainError,
    ) -> DomainResult<Option<String>> {
        error!(
            handler,
            thought_id = %thought.id,
            error = %error,
            "action parameters failed validation"
        );
        self.audit(handler, action, context, "failed").await;
        self.write_terminal(&thought.id, ThoughtStatus::Failed, Some(result))
            .await?;
        let follow_up_id = self
            .create_error_follow_up(
                thought,
                format!(
                    "{} action failed for thought {}. Reason: {error}. \
                     Review the parameters and determine next steps.",
                    action.as_str().to_uppercase(),
                    thought.id
                ),
                action,
                error.to_string(),
            )
            .await?;
        Ok(Some(follow_up_id))
    }

    /// Channel the action should address: explicit parameter, then the
    /// thought's context, then the dispatch snapshot.
    pub fn resolve_channel_id(
        explicit: Option<&str>,
        thought: &Thought,
        context: &DispatchContext,
    ) -> Option<String> {
        explicit
            .map(String::from)
            .or_else(|| thought.context.channel_id.clone())
            .or_else(|| context.channel_id.clone())
    }

    /// Normalize a channel id for the provider: strip the display
    /// prefix and surrounding whitespace.
    pub fn sanitize_channel_id(raw: &str) -> String {
        raw.trim().trim_start_matches('#').to_string()
    }
}

//! TOOL handler: validate, execute, and await a correlated tool result.

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use super::base::{ActionHandler, HandlerServices};
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ActionKind, ActionSelectionResult, CorrelationStatus, DispatchContext, ServiceCorrelation,
    ServiceType, Thought, ThoughtStatus, ThoughtType, ToolParams,
};

pub struct ToolHandler {
    services: HandlerServices,
}

impl ToolHandler {
    pub const NAME: &'static str = "ToolHandler";

    pub fn new(services: HandlerServices) -> Self {
        Self { services }
    }

    async fn record_correlation(
        &self,
        thought: &Thought,
        tool_name: &str,
        arguments: &serde_json::Value,
        correlation_id: &str,
        success: bool,
        detail: &str,
    ) -> DomainResult<()> {
        let correlation = ServiceCorrelation {
            id: correlation_id.to_string(),
            ..ServiceCorrelation::new(
                ServiceType::Tool,
                Self::NAME,
                "tool_execution",
                thought.source_task_id.clone(),
                if success {
                    CorrelationStatus::Completed
                } else {
                    CorrelationStatus::Failed
                },
            )
        }
        .with_thought(thought.id.clone())
        .with_request(json!({"name": tool_name, "arguments": arguments}))
        .with_response(json!({"success": success, "detail": detail}));
        self.services.store.add_correlation(&correlation).await
    }
}

#[async_trait]
impl ActionHandler for ToolHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn handle(
        &self,
        result: &ActionSelectionResult,
        thought: &Thought,
        context: &DispatchContext,
    ) -> DomainResult<Option<String>> {
        let params: ToolParams = match result.parse_params() {
            Ok(params) => params,
            Err(e) => {
                return self
                    .services
                    .fail_validation(Self::NAME, ActionKind::Tool, result, thought, context, &e)
                    .await;
            }
        };

        self.services
            .audit(Self::NAME, ActionKind::Tool, context, "start")
            .await;

        let arguments = serde_json::Value::Object(params.arguments.clone());
        let correlation_id = &context.correlation_id;
        let timeout = self.services.config.workflow.tool_result_timeout();

        let execution: Result<String, String> = async {
            let valid = self
                .services
                .bus
                .validate_tool_parameters(Self::NAME, &params.name, &arguments)
                .await
                .map_err(|e| format!("tool validation unavailable: {e}"))?;
            if !valid {
                return Err(format!("arguments for tool '{}' failed validation", params.name));
            }

            self.services
                .bus
                .execute_tool(Self::NAME, &params.name, &arguments, correlation_id)
                .await
                .map_err(|e| format!("tool execution failed: {e}"))?;

            let tool_result = self
                .services
                .bus
                .get_tool_result(Self::NAME, correlation_id, timeout)
                .await
                .map_err(|e| format!("tool result unavailable: {e}"))?;

            match tool_result.error {
                None => Ok(tool_result
                    .result
                    .map_or_else(|| "no output".to_string(), |v| v.to_string())),
                Some(error) => Err(format!("tool '{}' reported an error: {error}", params.name)),
            }
        }
        .await;

        let (status, follow_up_text) = match &execution {
            Ok(output) => {
                info!(
                    thought_id = %thought.id,
                    tool = %params.name,
                    "tool executed successfully"
                );
                (
                    ThoughtStatus::Completed,
                    format!(
                        "Tool '{}' executed for thought {}. Result: {output}. \
                         If this completes the task, select TASK_COMPLETE.",
                        params.name, thought.id
                    ),
                )
            }
            Err(reason) => {
                warn!(
                    thought_id = %thought.id,
                    tool = %params.name,
                    reason = %reason,
                    "tool execution failed"
                );
                (
                    ThoughtStatus::Failed,
                    format!(
                        "TOOL action failed for thought {}. Reason: {reason}. \
                         Review and determine next steps.",
                        thought.id
                    ),
                )
            }
        };

        let detail = match &execution {
            Ok(s) | Err(s) => s.clone(),
        };
        self.record_correlation(
            thought,
            &params.name,
            &arguments,
            correlation_id,
            execution.is_ok(),
            &detail,
        )
        .await?;

        self.services
            .write_terminal(&thought.id, status, Some(result))
            .await?;

        let follow_up_id = if status == ThoughtStatus::Completed {
            self.services
                .create_follow_up(thought, follow_up_text, ThoughtType::FollowUp)
                .await?
        } else {
            self.services
                .create_error_follow_up(
                    thought,
                    follow_up_text,
                    ActionKind::Tool,
                    execution.err().unwrap_or_default(),
                )
                .await?
        };

        self.services
            .audit(
                Self::NAME,
                ActionKind::Tool,
                context,
                if status == ThoughtStatus::Completed {
                    "success"
                } else {
                    "failed"
                },
            )
            .await;
        Ok(Some(follow_up_id))
    }
}

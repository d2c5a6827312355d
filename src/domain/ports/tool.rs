//! Tool service port.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::errors::DomainResult;
use crate::domain::models::ToolResult;

pub const CAP_EXECUTE_TOOL: &str = "execute_tool";

/// External tool execution with correlated, timeout-bounded results.
#[async_trait]
pub trait ToolService: Send + Sync {
    /// Names of the tools this provider offers.
    async fn available_tools(&self) -> DomainResult<Vec<String>>;

    async fn validate_parameters(
        &self,
        name: &str,
        arguments: &serde_json::Value,
    ) -> DomainResult<bool>;

    /// Start executing a tool. The result is retrieved separately via
    /// the correlation id.
    async fn execute_tool(
        &self,
        name: &str,
        arguments: &serde_json::Value,
        correlation_id: &str,
    ) -> DomainResult<()>;

    /// Wait up to `timeout` for the correlated result.
    async fn get_tool_result(
        &self,
        correlation_id: &str,
        timeout: Duration,
    ) -> DomainResult<ToolResult>;

    async fn is_healthy(&self) -> bool {
        true
    }
}

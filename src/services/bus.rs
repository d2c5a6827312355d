//! Typed service bus.
//!
//! Thin facade over the service registry. Every call resolves a provider
//! afresh, so adapter restarts and rebinds are transparent to handlers,
//! and records the outcome against the provider's circuit breaker.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ActionKind, DeferralPackage, FetchedMessage, GraphNode, GuidanceContext, MemoryOpResult,
    ServiceType, ToolResult,
};
use crate::domain::ports::{
    AuditContext, LlmRequest, LlmResponse, CAP_EXECUTE_TOOL, CAP_FETCH_MESSAGES, CAP_FORGET,
    CAP_MEMORIZE, CAP_RECALL, CAP_SEND_MESSAGE,
};
use crate::services::registry::ServiceRegistry;

/// Typed facade over the registry for handlers and evaluators.
pub struct Bus {
    registry: Arc<ServiceRegistry>,
}

impl Bus {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    async fn record(&self, service_type: ServiceType, provider: &str, ok: bool) {
        if ok {
            self.registry.record_success(service_type, provider).await;
        } else {
            self.registry.record_failure(service_type, provider).await;
        }
    }

    // -- communication -------------------------------------------------

    pub async fn send_message(
        &self,
        handler: &str,
        channel_id: &str,
        content: &str,
    ) -> DomainResult<()> {
        let resolved = self
            .registry
            .get_communication(handler, &[CAP_SEND_MESSAGE])
            .await
            .ok_or_else(|| {
                DomainError::service_unavailable(
                    ServiceType::Communication.as_str(),
                    format!("no send-capable provider for handler {handler}"),
                )
            })?;
        let result = resolved.provider.send_message(channel_id, content).await;
        self.record(ServiceType::Communication, &resolved.name, result.is_ok())
            .await;
        result
    }

    pub async fn fetch_messages(
        &self,
        handler: &str,
        channel_id: &str,
        limit: usize,
    ) -> DomainResult<Vec<FetchedMessage>> {
        let resolved = self
            .registry
            .get_communication(handler, &[CAP_FETCH_MESSAGES])
            .await
            .ok_or_else(|| {
                DomainError::service_unavailable(
                    ServiceType::Communication.as_str(),
                    format!("no fetch-capable provider for handler {handler}"),
                )
            })?;
        let result = resolved.provider.fetch_messages(channel_id, limit).await;
        self.record(ServiceType::Communication, &resolved.name, result.is_ok())
            .await;
        result
    }

    // -- memory --------------------------------------------------------

    pub async fn memorize(&self, handler: &str, node: &GraphNode) -> DomainResult<MemoryOpResult> {
        let resolved = self
            .registry
            .get_memory(handler, &[CAP_MEMORIZE])
            .await
            .ok_or_else(|| {
                DomainError::service_unavailable(ServiceType::Memory.as_str(), "no memory provider")
            })?;
        let result = resolved.provider.memorize(node).await;
        self.record(ServiceType::Memory, &resolved.name, result.is_ok())
            .await;
        result
    }

    pub async fn recall(&self, handler: &str, node: &GraphNode) -> DomainResult<MemoryOpResult> {
        let resolved = self
            .registry
            .get_memory(handler, &[CAP_RECALL])
            .await
            .ok_or_else(|| {
                DomainError::service_unavailable(ServiceType::Memory.as_str(), "no memory provider")
            })?;
        let result = resolved.provider.recall(node).await;
        self.record(ServiceType::Memory, &resolved.name, result.is_ok())
            .await;
        result
    }

    pub async fn forget(&self, handler: &str, node: &GraphNode) -> DomainResult<MemoryOpResult> {
        let resolved = self
            .registry
            .get_memory(handler, &[CAP_FORGET])
            .await
            .ok_or_else(|| {
                DomainError::service_unavailable(ServiceType::Memory.as_str(), "no memory provider")
            })?;
        let result = resolved.provider.forget(node).await;
        self.record(ServiceType::Memory, &resolved.name, result.is_ok())
            .await;
        result
    }

    // -- tools ---------------------------------------------------------

    /// Tool names advertised across every registered tool provider.
    ///
    /// A name offered by more than one provider is disambiguated by
    /// prefixing the provider's registration name (`provider/tool`).
    pub async fn available_tools(&self, handler: &str) -> DomainResult<Vec<String>> {
        let providers = self.registry.get_all_tools(handler).await;
        let mut per_provider: Vec<(String, Vec<String>)> = Vec::new();
        let mut name_counts: HashMap<String, usize> = HashMap::new();

        for resolved in providers {
            match resolved.provider.available_tools().await {
                Ok(tools) => {
                    for tool in &tools {
                        *name_counts.entry(tool.clone()).or_default() += 1;
                    }
                    self.record(ServiceType::Tool, &resolved.name, true).await;
                    per_provider.push((resolved.name, tools));
                }
                Err(e) => {
                    warn!(provider = %resolved.name, error = %e, "tool enumeration failed");
                    self.record(ServiceType::Tool, &resolved.name, false).await;
                }
            }
        }

        let mut merged = Vec::new();
        for (provider_name, tools) in per_provider {
            for tool in tools {
                if name_counts.get(&tool).copied().unwrap_or(0) > 1 {
                    merged.push(format!("{provider_name}/{tool}"));
                } else {
                    merged.push(tool);
                }
            }
        }
        merged.sort();
        Ok(merged)
    }

    pub async fn validate_tool_parameters(
        &self,
        handler: &str,
        name: &str,
        arguments: &serde_json::Value,
    ) -> DomainResult<bool> {
        let resolved = self
            .registry
            .get_tool(handler, &[CAP_EXECUTE_TOOL])
            .await
            .ok_or_else(|| {
                DomainError::service_unavailable(ServiceType::Tool.as_str(), "no tool provider")
            })?;
        let result = resolved.provider.validate_parameters(name, arguments).await;
        self.record(ServiceType::Tool, &resolved.name, result.is_ok())
            .await;
        result
    }

    pub async fn execute_tool(
        &self,
        handler: &str,
        name: &str,
        arguments: &serde_json::Value,
        correlation_id: &str,
    ) -> DomainResult<()> {
        let resolved = self
            .registry
            .get_tool(handler, &[CAP_EXECUTE_TOOL])
            .await
            .ok_or_else(|| {
                DomainError::service_unavailable(ServiceType::Tool.as_str(), "no tool provider")
            })?;
        let result = resolved
            .provider
            .execute_tool(name, arguments, correlation_id)
            .await;
        self.record(ServiceType::Tool, &resolved.name, result.is_ok())
            .await;
        result
    }

    pub async fn get_tool_result(
        &self,
        handler: &str,
        correlation_id: &str,
        timeout: Duration,
    ) -> DomainResult<ToolResult> {
        let resolved = self
            .registry
            .get_tool(handler, &[CAP_EXECUTE_TOOL])
            .await
            .ok_or_else(|| {
                DomainError::service_unavailable(ServiceType::Tool.as_str(), "no tool provider")
            })?;
        let result = resolved
            .provider
            .get_tool_result(correlation_id, timeout)
            .await;
        // A timeout is the tool's failure, not the provider's.
        let provider_ok = !matches!(result, Err(DomainError::ServiceUnavailable { .. }));
        self.record(ServiceType::Tool, &resolved.name, provider_ok)
            .await;
        result
    }

    // -- audit ---------------------------------------------------------

    /// Best-effort audit logging; failures are logged, never propagated.
    pub async fn log_audit(
        &self,
        handler: &str,
        action: ActionKind,
        context: &AuditContext,
        outcome: &str,
    ) {
        let Some(resolved) = self.registry.get_audit(handler).await else {
            return;
        };
        let result = resolved.provider.log_action(action, context, outcome).await;
        if let Err(e) = &result {
            warn!(handler, error = %e, "audit logging failed");
        }
        self.record(ServiceType::Audit, &resolved.name, result.is_ok())
            .await;
    }

    // -- wise authority ------------------------------------------------

    pub async fn send_deferral(
        &self,
        handler: &str,
        package: &DeferralPackage,
    ) -> DomainResult<()> {
        let resolved = self.registry.get_wise_authority(handler).await.ok_or_else(|| {
            DomainError::service_unavailable(
                ServiceType::WiseAuthority.as_str(),
                "no wise authority provider",
            )
        })?;
        let result = resolved.provider.send_deferral(package).await;
        self.record(ServiceType::WiseAuthority, &resolved.name, result.is_ok())
            .await;
        result
    }

    pub async fn fetch_guidance(
        &self,
        handler: &str,
        context: &GuidanceContext,
    ) -> DomainResult<Option<String>> {
        let resolved = self.registry.get_wise_authority(handler).await.ok_or_else(|| {
            DomainError::service_unavailable(
                ServiceType::WiseAuthority.as_str(),
                "no wise authority provider",
            )
        })?;
        let result = resolved.provider.fetch_guidance(context).await;
        self.record(ServiceType::WiseAuthority, &resolved.name, result.is_ok())
            .await;
        result
    }

    // -- llm -----------------------------------------------------------

    pub async fn generate_structured(
        &self,
        handler: &str,
        request: &LlmRequest,
    ) -> DomainResult<LlmResponse> {
        let resolved = self.registry.get_llm(handler).await.ok_or_else(|| {
            DomainError::service_unavailable(ServiceType::Llm.as_str(), "no llm provider")
        })?;
        let result = resolved.provider.generate_structured(request).await;
        self.record(ServiceType::Llm, &resolved.name, result.is_ok())
            .await;
        result
    }
}

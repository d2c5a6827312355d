//! Runtime configuration types.
//!
//! File and environment loading is the embedder's concern; defaults here
//! match the documented runtime behavior.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::correlation::ServiceType;

/// Well-known id of the wakeup ritual root task.
pub const WAKEUP_ROOT_TASK_ID: &str = "WAKEUP_ROOT";
/// Well-known id reserved for system-level operations.
pub const SYSTEM_TASK_ID: &str = "SYSTEM_TASK";
/// Well-known id of the persistent observation job.
pub const MONITOR_TASK_ID: &str = "job-monitor";
/// Well-known id of the dream-mode background task.
pub const DREAM_TASK_ID: &str = "DREAM_TASK";

/// Workflow limits for the cognitive scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Cap on concurrently ACTIVE tasks.
    pub max_active_tasks: usize,
    /// Cap on thoughts in flight through the pipeline at once.
    pub max_inflight_thoughts: usize,
    /// Capacity of the bounded queue between feeder and workers.
    pub queue_capacity: usize,
    /// Thoughts pulled from the store per work tick.
    pub batch_size: usize,
    /// Ponder passes a deliberation chain may consume before deferring.
    pub max_ponder_rounds: u32,
    /// Round cap surfaced to the action-selection prompt.
    pub max_rounds: u32,
    /// Retry attempts per evaluator invocation.
    pub dma_retry_limit: u32,
    /// Retry attempts per guardrail check.
    pub guardrail_retry_limit: u32,
    /// How long to wait for a correlated tool result.
    pub tool_result_timeout_secs: u64,
    /// Messages fetched by an active OBSERVE.
    pub observe_history_limit: usize,
    /// Consecutive idle work ticks before the processor drops into
    /// dream mode. `None` disables dream mode.
    pub dream_after_idle_ticks: Option<u32>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_active_tasks: 10,
            max_inflight_thoughts: 4,
            queue_capacity: 64,
            batch_size: 16,
            max_ponder_rounds: 5,
            max_rounds: 5,
            dma_retry_limit: 3,
            guardrail_retry_limit: 3,
            tool_result_timeout_secs: 30,
            observe_history_limit: 10,
            dream_after_idle_ticks: None,
        }
    }
}

impl WorkflowConfig {
    pub fn tool_result_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_result_timeout_secs)
    }
}

/// Per-provider circuit breaker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Seconds the circuit stays open before admitting a probe.
    pub cooldown_secs: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_secs: 60,
        }
    }
}

impl CircuitBreakerSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Priority tier of a registered provider. Lower tiers win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServicePriority {
    Critical,
    High,
    Normal,
    Low,
    Fallback,
}

impl Default for ServicePriority {
    fn default() -> Self {
        Self::Normal
    }
}

impl ServicePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
            Self::Fallback => "fallback",
        }
    }
}

/// Declarative registration entry the embedder can map providers onto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRegistrationEntry {
    pub service_type: ServiceType,
    /// Provider name as registered in code.
    pub provider: String,
    #[serde(default)]
    pub priority: ServicePriority,
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Restrict the registration to one handler, or leave global.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler_scope: Option<String>,
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub workflow: WorkflowConfig,
    pub circuit_breaker: CircuitBreakerSettings,
    /// Task ids exempt from child-driven terminal transitions.
    pub protected_task_ids: Vec<String>,
    /// Declarative service registrations for the embedder to honor.
    pub service_registrations: Vec<ServiceRegistrationEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workflow: WorkflowConfig::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            protected_task_ids: vec![
                WAKEUP_ROOT_TASK_ID.to_string(),
                SYSTEM_TASK_ID.to_string(),
                MONITOR_TASK_ID.to_string(),
                DREAM_TASK_ID.to_string(),
            ],
            service_registrations: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Whether `task_id` belongs to the protected-root set.
    pub fn is_protected_task(&self, task_id: &str) -> bool {
        self.protected_task_ids.iter().any(|id| id == task_id)
    }
}

//! Domain models
//!
//! Pure domain entities with business logic and validation rules.
//! These models are framework-agnostic and contain no infrastructure
//! concerns.

pub mod action;
pub mod config;
pub mod correlation;
pub mod deferral;
pub mod dispatch;
pub mod dma;
pub mod memory;
pub mod message;
pub mod processing;
pub mod profile;
pub mod queue;
pub mod task;
pub mod thought;

pub use action::{
    ActionKind, ActionSelectionResult, DeferParams, ForgetParams, MemorizeParams, ObserveParams,
    PonderParams, RecallParams, RejectParams, SpeakParams, TaskCompleteParams, ToolParams,
    ToolResult,
};
pub use config::{
    AppConfig, CircuitBreakerSettings, ServicePriority, ServiceRegistrationEntry, WorkflowConfig,
    DREAM_TASK_ID, MONITOR_TASK_ID, SYSTEM_TASK_ID, WAKEUP_ROOT_TASK_ID,
};
pub use correlation::{CorrelationStatus, ServiceCorrelation, ServiceType};
pub use deferral::{DeferralPackage, GuidanceContext};
pub use dispatch::DispatchContext;
pub use dma::{
    CommonSenseResult, DmaFailure, DmaResults, DomainSpecificResult, EthicalResult,
    EthicalVerdict, ProcessedThought, ResourceUsage,
};
pub use memory::{GraphNode, GraphScope, MemoryOpResult, MemoryOpStatus, NodeType};
pub use message::{FetchedMessage, IncomingMessage};
pub use processing::{
    EpistemicData, EpistemicHumility, GuardrailCheck, GuardrailResult, OptimizationVeto,
    VetoDecision,
};
pub use profile::{AgentProfile, DomainProfile};
pub use queue::ProcessingQueueItem;
pub use task::{Task, TaskContext, TaskStatus, WakeupStep};
pub use thought::{Thought, ThoughtContext, ThoughtStatus, ThoughtType};

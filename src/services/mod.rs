//! The cognitive scheduler: registry, bus, evaluators, guardrails,
//! handlers, and the processor loop that ties them together.

pub mod bus;
pub mod context_builder;
pub mod dma;
pub mod guardrails;
pub mod handlers;
pub mod ponder;
pub mod processor;
pub mod registry;
pub mod shutdown;
pub mod task_manager;

pub use bus::Bus;
pub use context_builder::ContextBuilder;
pub use dma::{
    ActionSelectionInput, ActionSelector, CommonSenseEvaluator, DmaOrchestrator,
    DomainSpecificEvaluator, EthicalEvaluator, EvaluationInput, EvaluatorOutcome,
    LlmActionSelector, LlmCommonSenseEvaluator, LlmEthicalEvaluator, ProfileDomainEvaluator,
    run_with_retries,
};
pub use guardrails::{
    EpistemicGuardrail, Guardrail, GuardrailContext, GuardrailOrchestrator, GuardrailRegistry,
};
pub use handlers::{build_action_dispatcher, ActionDispatcher, ActionHandler, HandlerServices};
pub use ponder::{PonderManager, PonderOutcome};
pub use processor::{AgentProcessor, ProcessorState, ThoughtPipeline, TickReport, WakeupOutcome};
pub use registry::{
    CircuitBreaker, CircuitState, RegistrationScope, Resolved, ServiceProvider,
    ServiceRegistration, ServiceRegistry,
};
pub use shutdown::ShutdownManager;
pub use task_manager::TaskManager;

//! Shared test harness: mock collaborators and a runtime builder.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use covenant::domain::errors::{DomainError, DomainResult};
use covenant::domain::models::{
    ActionKind, ActionSelectionResult, AgentProfile, AppConfig, DeferParams, DeferralPackage,
    FetchedMessage, ForgetParams, GraphNode, GuidanceContext, MemorizeParams, MemoryOpResult,
    ObserveParams, PonderParams, RecallParams, RejectParams, SpeakParams, Task, TaskContext,
    Thought, ToolParams, ToolResult,
};
use covenant::domain::ports::{
    AuditContext, AuditService, CommunicationService, MemoryService, Store, ToolService,
    WiseAuthorityService, CAP_EXECUTE_TOOL, CAP_FORGET, CAP_MEMORIZE, CAP_RECALL,
};
use covenant::infrastructure::database::{DatabaseConnection, SqliteStore};
use covenant::services::dma::{
    ActionSelectionInput, ActionSelector, CommonSenseEvaluator, DmaOrchestrator,
    DomainSpecificEvaluator, EthicalEvaluator, EvaluationInput,
};
use covenant::services::guardrails::{
    Guardrail, GuardrailContext, GuardrailOrchestrator, GuardrailRegistry,
};
use covenant::services::handlers::{build_action_dispatcher, HandlerServices};
use covenant::services::processor::{AgentProcessor, ThoughtPipeline, TickReport};
use covenant::services::{
    Bus, ContextBuilder, PonderManager, ServiceProvider, ServiceRegistration, ServiceRegistry,
    ShutdownManager, TaskManager,
};
use covenant::domain::models::{
    CommonSenseResult, DomainSpecificResult, EthicalResult, EthicalVerdict, GuardrailCheck,
};

// -- action constructors ------------------------------------------------

pub fn speak(content: &str) -> ActionSelectionResult {
    ActionSelectionResult::new(
        ActionKind::Speak,
        &SpeakParams {
            channel_id: None,
            content: content.to_string(),
        },
        "scripted speak",
    )
}

pub fn speak_to(channel: &str, content: &str) -> ActionSelectionResult {
    ActionSelectionResult::new(
        ActionKind::Speak,
        &SpeakParams {
            channel_id: Some(channel.to_string()),
            content: content.to_string(),
        },
        "scripted speak",
    )
}

pub fn ponder(questions: &[&str]) -> ActionSelectionResult {
    ponder_questions(questions.iter().map(|q| (*q).to_string()).collect())
}

pub fn ponder_questions(questions: Vec<String>) -> ActionSelectionResult {
    ActionSelectionResult::new(
        ActionKind::Ponder,
        &PonderParams { questions },
        "scripted ponder",
    )
}

pub fn task_complete() -> ActionSelectionResult {
    ActionSelectionResult::new(
        ActionKind::TaskComplete,
        &covenant::domain::models::TaskCompleteParams::default(),
        "scripted completion",
    )
}

pub fn defer(reason: &str) -> ActionSelectionResult {
    ActionSelectionResult::new(
        ActionKind::Defer,
        &DeferParams {
            reason: reason.to_string(),
            ethical_summary: None,
            common_sense_summary: None,
            domain_summary: None,
        },
        "scripted defer",
    )
}

pub fn reject(reason: &str) -> ActionSelectionResult {
    ActionSelectionResult::new(
        ActionKind::Reject,
        &RejectParams {
            reason: reason.to_string(),
            create_filter: false,
            filter_pattern: None,
            filter_type: None,
            filter_priority: None,
        },
        "scripted reject",
    )
}

pub fn memorize(node: GraphNode) -> ActionSelectionResult {
    ActionSelectionResult::new(ActionKind::Memorize, &MemorizeParams { node }, "scripted memorize")
}

pub fn recall(node: GraphNode) -> ActionSelectionResult {
    ActionSelectionResult::new(ActionKind::Recall, &RecallParams { node }, "scripted recall")
}

pub fn forget(node: GraphNode, reason: &str) -> ActionSelectionResult {
    ActionSelectionResult::new(
        ActionKind::Forget,
        &ForgetParams {
            node,
            reason: reason.to_string(),
            no_audit: false,
        },
        "scripted forget",
    )
}

pub fn tool(name: &str, arguments: serde_json::Value) -> ActionSelectionResult {
    let arguments = arguments
        .as_object()
        .cloned()
        .unwrap_or_default();
    ActionSelectionResult::new(
        ActionKind::Tool,
        &ToolParams {
            name: name.to_string(),
            arguments,
        },
        "scripted tool",
    )
}

pub fn observe_active(channel: Option<&str>) -> ActionSelectionResult {
    ActionSelectionResult::new(
        ActionKind::Observe,
        &ObserveParams {
            channel_id: channel.map(String::from),
            active: true,
        },
        "scripted observe",
    )
}

// -- mock collaborators -------------------------------------------------

#[derive(Default)]
pub struct MockComm {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail_sends: AtomicBool,
    pub history: Mutex<Vec<FetchedMessage>>,
}

#[async_trait]
impl CommunicationService for MockComm {
    async fn send_message(&self, channel_id: &str, content: &str) -> DomainResult<()> {
        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(DomainError::Timeout("send failed".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel_id.to_string(), content.to_string()));
        Ok(())
    }

    async fn fetch_messages(
        &self,
        _channel_id: &str,
        limit: usize,
    ) -> DomainResult<Vec<FetchedMessage>> {
        let history = self.history.lock().unwrap();
        Ok(history.iter().rev().take(limit).rev().cloned().collect())
    }
}

#[derive(Default)]
pub struct MockMemory {
    pub nodes: Mutex<HashMap<String, GraphNode>>,
}

#[async_trait]
impl MemoryService for MockMemory {
    async fn memorize(&self, node: &GraphNode) -> DomainResult<MemoryOpResult> {
        self.nodes
            .lock()
            .unwrap()
            .insert(node.id.clone(), node.clone());
        Ok(MemoryOpResult::ok())
    }

    async fn recall(&self, node: &GraphNode) -> DomainResult<MemoryOpResult> {
        let nodes = self.nodes.lock().unwrap();
        Ok(match nodes.get(&node.id) {
            Some(found) => MemoryOpResult::ok_with(serde_json::to_value(found).unwrap()),
            None => MemoryOpResult::ok(),
        })
    }

    async fn forget(&self, node: &GraphNode) -> DomainResult<MemoryOpResult> {
        self.nodes.lock().unwrap().remove(&node.id);
        Ok(MemoryOpResult::ok())
    }
}

#[derive(Default)]
pub struct MockTool {
    pub results: Mutex<HashMap<String, ToolResult>>,
}

#[async_trait]
impl ToolService for MockTool {
    async fn available_tools(&self) -> DomainResult<Vec<String>> {
        Ok(vec!["echo".to_string()])
    }

    async fn validate_parameters(
        &self,
        name: &str,
        _arguments: &serde_json::Value,
    ) -> DomainResult<bool> {
        Ok(name == "echo")
    }

    async fn execute_tool(
        &self,
        _name: &str,
        arguments: &serde_json::Value,
        correlation_id: &str,
    ) -> DomainResult<()> {
        self.results.lock().unwrap().insert(
            correlation_id.to_string(),
            ToolResult {
                result: Some(serde_json::json!({"echo": arguments})),
                error: None,
            },
        );
        Ok(())
    }

    async fn get_tool_result(
        &self,
        correlation_id: &str,
        _timeout: Duration,
    ) -> DomainResult<ToolResult> {
        Ok(self
            .results
            .lock()
            .unwrap()
            .get(correlation_id)
            .cloned()
            .unwrap_or(ToolResult {
                result: None,
                error: Some("no result within timeout".to_string()),
            }))
    }
}

#[derive(Default)]
pub struct MockWiseAuthority {
    pub deferrals: Mutex<Vec<DeferralPackage>>,
}

#[async_trait]
impl WiseAuthorityService for MockWiseAuthority {
    async fn send_deferral(&self, package: &DeferralPackage) -> DomainResult<()> {
        self.deferrals.lock().unwrap().push(package.clone());
        Ok(())
    }

    async fn fetch_guidance(&self, _context: &GuidanceContext) -> DomainResult<Option<String>> {
        Ok(None)
    }
}

#[derive(Default)]
pub struct MockAudit {
    pub events: Mutex<Vec<(ActionKind, String)>>,
}

#[async_trait]
impl AuditService for MockAudit {
    async fn log_action(
        &self,
        action: ActionKind,
        _context: &AuditContext,
        outcome: &str,
    ) -> DomainResult<()> {
        self.events
            .lock()
            .unwrap()
            .push((action, outcome.to_string()));
        Ok(())
    }
}

// -- scripted evaluators ------------------------------------------------

pub struct StaticEthical;

#[async_trait]
impl EthicalEvaluator for StaticEthical {
    async fn evaluate(&self, _input: &EvaluationInput) -> DomainResult<EthicalResult> {
        Ok(EthicalResult {
            verdict: EthicalVerdict::Approve,
            rationale: Some("benign".into()),
            alignment_check: serde_json::Value::Null,
            resource_usage: None,
        })
    }
}

pub struct StaticCommonSense;

#[async_trait]
impl CommonSenseEvaluator for StaticCommonSense {
    async fn evaluate(&self, _input: &EvaluationInput) -> DomainResult<CommonSenseResult> {
        Ok(CommonSenseResult {
            plausibility_score: 0.95,
            flags: vec![],
            reasoning: None,
            resource_usage: None,
        })
    }
}

pub struct FailingDomain;

#[async_trait]
impl DomainSpecificEvaluator for FailingDomain {
    fn domain(&self) -> &str {
        "testing"
    }

    async fn evaluate(&self, _input: &EvaluationInput) -> DomainResult<DomainSpecificResult> {
        Err(DomainError::EvaluatorFailed {
            evaluator: "domain_specific".into(),
            message: "backend permanently down".into(),
        })
    }
}

/// Pops a scripted action per selection; falls back to TASK_COMPLETE
/// once the script is exhausted.
pub struct ScriptedSelector {
    script: Mutex<VecDeque<ActionSelectionResult>>,
}

impl ScriptedSelector {
    pub fn new(script: Vec<ActionSelectionResult>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl ActionSelector for ScriptedSelector {
    async fn select_action(
        &self,
        _input: &ActionSelectionInput,
    ) -> DomainResult<ActionSelectionResult> {
        Ok(self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(task_complete))
    }
}

// -- scripted guardrails ------------------------------------------------

pub struct PassGuardrail;

#[async_trait]
impl Guardrail for PassGuardrail {
    fn name(&self) -> &str {
        "pass"
    }

    async fn check(
        &self,
        _action: &ActionSelectionResult,
        _context: &GuardrailContext,
    ) -> DomainResult<GuardrailCheck> {
        Ok(GuardrailCheck::pass())
    }
}

pub struct FailGuardrail {
    pub reason: String,
}

impl FailGuardrail {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Guardrail for FailGuardrail {
    fn name(&self) -> &str {
        "always-fail"
    }

    async fn check(
        &self,
        _action: &ActionSelectionResult,
        _context: &GuardrailContext,
    ) -> DomainResult<GuardrailCheck> {
        Ok(GuardrailCheck::fail(self.reason.clone()))
    }
}

// -- runtime builder ----------------------------------------------------

pub struct TestRuntime {
    pub store: Arc<dyn Store>,
    pub registry: Arc<ServiceRegistry>,
    pub bus: Arc<Bus>,
    pub shutdown: Arc<ShutdownManager>,
    pub config: Arc<AppConfig>,
    pub task_manager: Arc<TaskManager>,
    pub processor: AgentProcessor,
    pub comm: Arc<MockComm>,
    pub memory: Arc<MockMemory>,
    pub tools: Arc<MockTool>,
    pub wise_authority: Arc<MockWiseAuthority>,
    pub audit: Arc<MockAudit>,
    pub selector: Arc<ScriptedSelector>,
}

impl TestRuntime {
    /// Create a pending task; the next tick activates and seeds it.
    pub async fn submit_task(&self, description: &str, channel: &str) -> Task {
        self.task_manager
            .create_task(description, 0, TaskContext::with_channel(channel), None)
            .await
            .expect("task creation failed")
    }

    pub async fn run_ticks(&mut self, count: usize) -> Vec<TickReport> {
        let mut reports = Vec::new();
        for _ in 0..count {
            reports.push(self.processor.tick().await.expect("tick failed"));
        }
        reports
    }

    /// Tick until a fully idle tick or the cap is hit.
    pub async fn run_until_idle(&mut self, max_ticks: usize) {
        for _ in 0..max_ticks {
            let report = self.processor.tick().await.expect("tick failed");
            if report.is_idle() {
                return;
            }
        }
    }

    pub async fn thoughts_for(&self, task_id: &str) -> Vec<Thought> {
        self.store
            .get_thoughts_by_task(task_id)
            .await
            .expect("thought query failed")
    }

    pub async fn task(&self, task_id: &str) -> Task {
        self.store
            .get_task(task_id)
            .await
            .expect("task query failed")
            .expect("task missing")
    }

    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.comm.sent.lock().unwrap().clone()
    }
}

pub struct RuntimeBuilder {
    config: AppConfig,
    script: Vec<ActionSelectionResult>,
    with_comm: bool,
    failing_domain: bool,
    guardrails: Vec<(u8, Arc<dyn Guardrail>)>,
    profile: AgentProfile,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        // Keep retry backoffs short in tests.
        let config = AppConfig {
            workflow: covenant::domain::models::WorkflowConfig {
                dma_retry_limit: 2,
                guardrail_retry_limit: 2,
                ..covenant::domain::models::WorkflowConfig::default()
            },
            ..AppConfig::default()
        };
        Self {
            config,
            script: Vec::new(),
            with_comm: true,
            failing_domain: false,
            guardrails: Vec::new(),
            profile: AgentProfile::named("test-agent"),
        }
    }

    pub fn script(mut self, actions: Vec<ActionSelectionResult>) -> Self {
        self.script = actions;
        self
    }

    pub fn without_communication(mut self) -> Self {
        self.with_comm = false;
        self
    }

    pub fn with_failing_domain_evaluator(mut self) -> Self {
        self.failing_domain = true;
        self
    }

    pub fn with_guardrail(mut self, priority: u8, guardrail: Arc<dyn Guardrail>) -> Self {
        self.guardrails.push((priority, guardrail));
        self
    }

    pub fn configure(mut self, f: impl FnOnce(&mut AppConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub async fn build(self) -> TestRuntime {
        let db = DatabaseConnection::in_memory().await.expect("db");
        db.migrate().await.expect("migrations");
        let store: Arc<dyn Store> = Arc::new(SqliteStore::new(db.pool().clone()));

        let config = Arc::new(self.config);
        let registry = Arc::new(ServiceRegistry::new(config.circuit_breaker.clone()));

        let comm = Arc::new(MockComm::default());
        let memory = Arc::new(MockMemory::default());
        let tools = Arc::new(MockTool::default());
        let wise_authority = Arc::new(MockWiseAuthority::default());
        let audit = Arc::new(MockAudit::default());

        if self.with_comm {
            registry
                .register(ServiceRegistration::new(
                    "mock-comm",
                    ServiceProvider::Communication(Arc::clone(&comm) as _),
                ))
                .await;
        }
        registry
            .register(
                ServiceRegistration::new(
                    "mock-memory",
                    ServiceProvider::Memory(Arc::clone(&memory) as _),
                )
                .with_capabilities([CAP_MEMORIZE, CAP_RECALL, CAP_FORGET]),
            )
            .await;
        registry
            .register(
                ServiceRegistration::new(
                    "mock-tools",
                    ServiceProvider::Tool(Arc::clone(&tools) as _),
                )
                .with_capability(CAP_EXECUTE_TOOL),
            )
            .await;
        registry
            .register(ServiceRegistration::new(
                "mock-wa",
                ServiceProvider::WiseAuthority(Arc::clone(&wise_authority) as _),
            ))
            .await;
        registry
            .register(ServiceRegistration::new(
                "mock-audit",
                ServiceProvider::Audit(Arc::clone(&audit) as _),
            ))
            .await;

        let bus = Arc::new(Bus::new(Arc::clone(&registry)));
        let shutdown = ShutdownManager::shared();

        let selector = Arc::new(ScriptedSelector::new(self.script));
        let domain_evaluator: Option<Arc<dyn DomainSpecificEvaluator>> = if self.failing_domain {
            Some(Arc::new(FailingDomain))
        } else {
            None
        };
        let dma = Arc::new(DmaOrchestrator::new(
            Arc::new(StaticEthical),
            Arc::new(StaticCommonSense),
            domain_evaluator,
            Arc::clone(&selector) as _,
            Arc::clone(&shutdown),
            &config.workflow,
        ));

        let mut guardrail_registry = GuardrailRegistry::new();
        for (priority, guardrail) in self.guardrails {
            guardrail_registry.register(priority, guardrail);
        }
        let guardrails = Arc::new(GuardrailOrchestrator::new(
            guardrail_registry,
            &config.workflow,
        ));

        let context_builder = Arc::new(ContextBuilder::new(
            Arc::clone(&store),
            self.profile.clone(),
        ));
        let pipeline = Arc::new(ThoughtPipeline::new(
            Arc::clone(&store),
            context_builder,
            dma,
            guardrails,
        ));

        let handler_services = HandlerServices::new(
            Arc::clone(&store),
            Arc::clone(&bus),
            Arc::clone(&shutdown),
            Arc::clone(&config),
        );
        let ponder_manager = Arc::new(PonderManager::new(
            Arc::clone(&store),
            Arc::clone(&config),
        ));
        let dispatcher = Arc::new(build_action_dispatcher(handler_services, ponder_manager));

        let task_manager = Arc::new(TaskManager::new(Arc::clone(&store), Arc::clone(&config)));
        let processor = AgentProcessor::new(
            Arc::clone(&store),
            Arc::clone(&task_manager),
            pipeline,
            dispatcher,
            Arc::clone(&shutdown),
            Arc::clone(&config),
        );

        TestRuntime {
            store,
            registry,
            bus,
            shutdown,
            config,
            task_manager,
            processor,
            comm,
            memory,
            tools,
            wise_authority,
            audit,
            selector,
        }
    }
}

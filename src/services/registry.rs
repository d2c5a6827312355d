//! Service registry: capability- and priority-based provider lookup.
//!
//! Providers register under a service type with a priority tier, a
//! capability set, and an optional per-handler scope. Lookup returns the
//! best healthy provider whose capabilities cover the request; every
//! provider is wrapped in a circuit breaker so repeated failures fail
//! fast instead of cascading.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::models::{CircuitBreakerSettings, ServicePriority, ServiceType};
use crate::domain::ports::{
    AuditService, CommunicationService, LlmService, MemoryService, ToolService,
    WiseAuthorityService,
};

/// State of a provider's circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally.
    Closed,
    /// Requests are blocked until the cooldown elapses.
    Open,
    /// One probe request is admitted to test recovery.
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

const STATE_CLOSED: u8 = 0;
const STATE_OPEN: u8 = 1;
const STATE_HALF_OPEN: u8 = 2;

/// Per-provider circuit breaker with lock-free counters.
///
/// Consecutive failures at or above the threshold open the circuit for a
/// cooldown; once the cooldown elapses a single probe is admitted, and
/// its outcome either closes or reopens the circuit.
#[derive(Debug)]
pub struct CircuitBreaker {
    settings: CircuitBreakerSettings,
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    opened_at_ms: AtomicI64,
    probe_in_flight: AtomicBool,
    open_count: AtomicU32,
}

impl CircuitBreaker {
    pub fn new(settings: CircuitBreakerSettings) -> Self {
        Self {
            settings,
            state: AtomicU8::new(STATE_CLOSED),
            consecutive_failures: AtomicU32::new(0),
            opened_at_ms: AtomicI64::new(0),
            probe_in_flight: AtomicBool::new(false),
            open_count: AtomicU32::new(0),
        }
    }

    pub fn state(&self) -> CircuitState {
        match self.state.load(Ordering::Acquire) {
            STATE_OPEN => CircuitState::Open,
            STATE_HALF_OPEN => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    /// How many times this circuit has opened.
    pub fn open_count(&self) -> u32 {
        self.open_count.load(Ordering::Relaxed)
    }

    /// Check whether a request may proceed right now.
    ///
    /// An open circuit past its cooldown transitions to half-open and
    /// admits exactly one probe.
    pub fn allows(&self) -> bool {
        match self.state.load(Ordering::Acquire) {
            STATE_CLOSED => true,
            STATE_OPEN => {
                let opened_at = self.opened_at_ms.load(Ordering::Acquire);
                let cooldown_ms = i64::try_from(self.settings.cooldown().as_millis()).unwrap_or(i64::MAX);
                if Utc::now().timestamp_millis() - opened_at >= cooldown_ms {
                    // Claim the probe slot before flipping the state, so
                    // callers that observe HALF_OPEN early are rejected.
                    self.probe_in_flight.store(true, Ordering::Release);
                    if self
                        .state
                        .compare_exchange(
                            STATE_OPEN,
                            STATE_HALF_OPEN,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        )
                        .is_ok()
                    {
                        return true;
                    }
                }
                false
            }
            STATE_HALF_OPEN => {
                // Admit only one probe at a time.
                !self.probe_in_flight.swap(true, Ordering::AcqRel)
            }
            _ => true,
        }
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
        self.probe_in_flight.store(false, Ordering::Release);
        self.state.store(STATE_CLOSED, Ordering::Release);
    }

    pub fn record_failure(&self) {
        let state = self.state.load(Ordering::Acquire);
        if state == STATE_HALF_OPEN {
            // A failed probe reopens the circuit immediately.
            self.open();
            return;
        }
        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if state == STATE_CLOSED && failures >= self.settings.failure_threshold {
            self.open();
        }
    }

    fn open(&self) {
        self.opened_at_ms
            .store(Utc::now().timestamp_millis(), Ordering::Release);
        self.probe_in_flight.store(false, Ordering::Release);
        self.state.store(STATE_OPEN, Ordering::Release);
        self.open_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Manual reset, for operator tooling.
    pub fn reset(&self) {
        self.record_success();
    }
}

/// The provider instance behind a registration: a closed sum over the
/// service ports, so handlers never branch on concrete provider types.
#[derive(Clone)]
pub enum ServiceProvider {
    Communication(Arc<dyn CommunicationService>),
    Memory(Arc<dyn MemoryService>),
    Tool(Arc<dyn ToolService>),
    WiseAuthority(Arc<dyn WiseAuthorityService>),
    Audit(Arc<dyn AuditService>),
    Llm(Arc<dyn LlmService>),
}

impl ServiceProvider {
    pub fn service_type(&self) -> ServiceType {
        match self {
            Self::Communication(_) => ServiceType::Communication,
            Self::Memory(_) => ServiceType::Memory,
            Self::Tool(_) => ServiceType::Tool,
            Self::WiseAuthority(_) => ServiceType::WiseAuthority,
            Self::Audit(_) => ServiceType::Audit,
            Self::Llm(_) => ServiceType::Llm,
        }
    }

    async fn is_healthy(&self) -> bool {
        match self {
            Self::Communication(p) => p.is_healthy().await,
            Self::Memory(p) => p.is_healthy().await,
            Self::Tool(p) => p.is_healthy().await,
            Self::WiseAuthority(p) => p.is_healthy().await,
            Self::Audit(p) => p.is_healthy().await,
            Self::Llm(p) => p.is_healthy().await,
        }
    }
}

/// Whether a registration serves every handler or just one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationScope {
    Global,
    Handler(String),
}

/// One provider registration.
pub struct ServiceRegistration {
    pub name: String,
    pub provider: ServiceProvider,
    pub priority: ServicePriority,
    pub capabilities: HashSet<String>,
    pub scope: RegistrationScope,
}

impl ServiceRegistration {
    pub fn new(name: impl Into<String>, provider: ServiceProvider) -> Self {
        let capabilities = match &provider {
            ServiceProvider::Communication(p) => p.capabilities().into_iter().collect(),
            _ => HashSet::new(),
        };
        Self {
            name: name.into(),
            provider,
            priority: ServicePriority::Normal,
            capabilities,
            scope: RegistrationScope::Global,
        }
    }

    pub fn with_priority(mut self, priority: ServicePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities.extend(capabilities.into_iter().map(Into::into));
        self
    }

    /// Scope this registration to a single handler.
    pub fn for_handler(mut self, handler_name: impl Into<String>) -> Self {
        self.scope = RegistrationScope::Handler(handler_name.into());
        self
    }
}

struct RegisteredService {
    registration: ServiceRegistration,
    breaker: CircuitBreaker,
}

impl RegisteredService {
    fn scope_rank(&self, handler: &str) -> Option<u8> {
        match &self.registration.scope {
            RegistrationScope::Handler(h) if h == handler => Some(0),
            RegistrationScope::Handler(_) => None,
            RegistrationScope::Global => Some(1),
        }
    }
}

/// A resolved provider plus the registration name used for breaker
/// bookkeeping.
pub struct Resolved<T> {
    pub name: String,
    pub provider: T,
}

/// Registry mapping (handler, service type, required capabilities) to
/// the best available provider.
pub struct ServiceRegistry {
    services: RwLock<HashMap<ServiceType, Vec<Arc<RegisteredService>>>>,
    breaker_settings: CircuitBreakerSettings,
}

impl ServiceRegistry {
    pub fn new(breaker_settings: CircuitBreakerSettings) -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            breaker_settings,
        }
    }

    /// Register a provider. Registration is rare; it takes a short
    /// exclusive section.
    pub async fn register(&self, registration: ServiceRegistration) {
        let service_type = registration.provider.service_type();
        debug!(
            service_type = service_type.as_str(),
            provider = %registration.name,
            priority = registration.priority.as_str(),
            "registering service provider"
        );
        let entry = Arc::new(RegisteredService {
            breaker: CircuitBreaker::new(self.breaker_settings.clone()),
            registration,
        });
        let mut services = self.services.write().await;
        services.entry(service_type).or_default().push(entry);
    }

    async fn resolve(
        &self,
        handler: &str,
        service_type: ServiceType,
        required_capabilities: &[&str],
    ) -> Option<Arc<RegisteredService>> {
        let services = self.services.read().await;
        let entries = services.get(&service_type)?;

        let mut candidates: Vec<(u8, &Arc<RegisteredService>)> = entries
            .iter()
            .filter_map(|e| e.scope_rank(handler).map(|rank| (rank, e)))
            .filter(|(_, e)| {
                required_capabilities
                    .iter()
                    .all(|cap| e.registration.capabilities.contains(*cap))
            })
            .collect();
        // Handler-scoped registrations win over global; priority tiers
        // break ties; registration order breaks the rest.
        candidates.sort_by_key(|(rank, e)| (*rank, e.registration.priority));

        for (_, entry) in candidates {
            if !entry.breaker.allows() {
                debug!(
                    provider = %entry.registration.name,
                    "skipping provider with open circuit"
                );
                continue;
            }
            if !entry.registration.provider.is_healthy().await {
                warn!(
                    provider = %entry.registration.name,
                    service_type = service_type.as_str(),
                    "skipping unhealthy provider"
                );
                continue;
            }
            return Some(Arc::clone(entry));
        }
        None
    }

    pub async fn get_communication(
        &self,
        handler: &str,
        required_capabilities: &[&str],
    ) -> Option<Resolved<Arc<dyn CommunicationService>>> {
        let entry = self
            .resolve(handler, ServiceType::Communication, required_capabilities)
            .await?;
        match &entry.registration.provider {
            ServiceProvider::Communication(p) => Some(Resolved {
                name: entry.registration.name.clone(),
                provider: Arc::clone(p),
            }),
            _ => None,
        }
    }

    pub async fn get_memory(
        &self,
        handler: &str,
        required_capabilities: &[&str],
    ) -> Option<Resolved<Arc<dyn MemoryService>>> {
        let entry = self
            .resolve(handler, ServiceType::Memory, required_capabilities)
            .await?;
        match &entry.registration.provider {
            ServiceProvider::Memory(p) => Some(Resolved {
                name: entry.registration.name.clone(),
                provider: Arc::clone(p),
            }),
            _ => None,
        }
    }

    pub async fn get_tool(
        &self,
        handler: &str,
        required_capabilities: &[&str],
    ) -> Option<Resolved<Arc<dyn ToolService>>> {
        let entry = self
            .resolve(handler, ServiceType::Tool, required_capabilities)
            .await?;
        match &entry.registration.provider {
            ServiceProvider::Tool(p) => Some(Resolved {
                name: entry.registration.name.clone(),
                provider: Arc::clone(p),
            }),
            _ => None,
        }
    }

    /// Every usable tool provider, for cross-provider tool aggregation.
    pub async fn get_all_tools(&self, handler: &str) -> Vec<Resolved<Arc<dyn ToolService>>> {
        let services = self.services.read().await;
        let Some(entries) = services.get(&ServiceType::Tool) else {
            return Vec::new();
        };
        let mut resolved = Vec::new();
        for entry in entries {
            if entry.scope_rank(handler).is_none() || !entry.breaker.allows() {
                continue;
            }
            if let ServiceProvider::Tool(p) = &entry.registration.provider {
                resolved.push(Resolved {
                    name: entry.registration.name.clone(),
                    provider: Arc::clone(p),
                });
            }
        }
        resolved
    }

    pub async fn get_wise_authority(
        &self,
        handler: &str,
    ) -> Option<Resolved<Arc<dyn WiseAuthorityService>>> {
        let entry = self.resolve(handler, ServiceType::WiseAuthority, &[]).await?;
        match &entry.registration.provider {
            ServiceProvider::WiseAuthority(p) => Some(Resolved {
                name: entry.registration.name.clone(),
                provider: Arc::clone(p),
            }),
            _ => None,
        }
    }

    pub async fn get_audit(&self, handler: &str) -> Option<Resolved<Arc<dyn AuditService>>> {
        let entry = self.resolve(handler, ServiceType::Audit, &[]).await?;
        match &entry.registration.provider {
            ServiceProvider::Audit(p) => Some(Resolved {
                name: entry.registration.name.clone(),
                provider: Arc::clone(p),
            }),
            _ => None,
        }
    }

    pub async fn get_llm(&self, handler: &str) -> Option<Resolved<Arc<dyn LlmService>>> {
        let entry = self.resolve(handler, ServiceType::Llm, &[]).await?;
        match &entry.registration.provider {
            ServiceProvider::Llm(p) => Some(Resolved {
                name: entry.registration.name.clone(),
                provider: Arc::clone(p),
            }),
            _ => None,
        }
    }

    /// Record a successful call against a provider's breaker.
    pub async fn record_success(&self, service_type: ServiceType, provider_name: &str) {
        if let Some(entry) = self.find(service_type, provider_name).await {
            entry.breaker.record_success();
        }
    }

    /// Record a failed call against a provider's breaker.
    pub async fn record_failure(&self, service_type: ServiceType, provider_name: &str) {
        if let Some(entry) = self.find(service_type, provider_name).await {
            entry.breaker.record_failure();
            if entry.breaker.state() == CircuitState::Open {
                warn!(
                    provider = provider_name,
                    service_type = service_type.as_str(),
                    open_count = entry.breaker.open_count(),
                    "circuit opened for provider"
                );
            }
        }
    }

    async fn find(
        &self,
        service_type: ServiceType,
        provider_name: &str,
    ) -> Option<Arc<RegisteredService>> {
        let services = self.services.read().await;
        services
            .get(&service_type)?
            .iter()
            .find(|e| e.registration.name == provider_name)
            .map(Arc::clone)
    }

    /// Circuit state of a named provider, for diagnostics.
    pub async fn circuit_state(
        &self,
        service_type: ServiceType,
        provider_name: &str,
    ) -> Option<CircuitState> {
        Some(self.find(service_type, provider_name).await?.breaker.state())
    }

    /// Block until at least one provider per named type is healthy, or
    /// the timeout elapses. With no explicit types, every type that has
    /// registrations must become ready.
    pub async fn wait_ready(
        &self,
        timeout: Duration,
        service_types: Option<&[ServiceType]>,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.all_ready(service_types).await {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn all_ready(&self, service_types: Option<&[ServiceType]>) -> bool {
        let services = self.services.read().await;
        let required: Vec<ServiceType> = match service_types {
            Some(types) => types.to_vec(),
            None => services.keys().copied().collect(),
        };
        drop(services);

        for service_type in required {
            let services = self.services.read().await;
            let Some(entries) = services.get(&service_type) else {
                return false;
            };
            let entries: Vec<Arc<RegisteredService>> = entries.iter().map(Arc::clone).collect();
            drop(services);

            let mut any_ready = false;
            for entry in entries {
                if entry.breaker.state() != CircuitState::Open
                    && entry.registration.provider.is_healthy().await
                {
                    any_ready = true;
                    break;
                }
            }
            if !any_ready {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainResult;
    use crate::domain::models::FetchedMessage;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct StubComm {
        healthy: AtomicBool,
    }

    impl StubComm {
        fn new() -> Self {
            Self {
                healthy: AtomicBool::new(true),
            }
        }
    }

    #[async_trait]
    impl CommunicationService for StubComm {
        async fn send_message(&self, _channel_id: &str, _content: &str) -> DomainResult<()> {
            Ok(())
        }

        async fn fetch_messages(
            &self,
            _channel_id: &str,
            _limit: usize,
        ) -> DomainResult<Vec<FetchedMessage>> {
            Ok(vec![])
        }

        async fn is_healthy(&self) -> bool {
            self.healthy.load(Ordering::Relaxed)
        }
    }

    fn breaker_settings(threshold: u32, cooldown_secs: u64) -> CircuitBreakerSettings {
        CircuitBreakerSettings {
            failure_threshold: threshold,
            cooldown_secs,
        }
    }

    #[test]
    fn test_breaker_opens_after_threshold() {
        let breaker = CircuitBreaker::new(breaker_settings(3, 60));
        assert_eq!(breaker.state(), CircuitState::Closed);

        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allows());
        assert_eq!(breaker.open_count(), 1);
    }

    #[test]
    fn test_breaker_success_resets_failure_streak() {
        let breaker = CircuitBreaker::new(breaker_settings(3, 60));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_breaker_half_open_probe_cycle() {
        // Zero cooldown: the circuit is immediately probeable once open.
        let breaker = CircuitBreaker::new(breaker_settings(1, 0));
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        // First caller becomes the probe, second is rejected.
        assert!(breaker.allows());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(!breaker.allows());

        // Probe failure reopens; probe success closes.
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        assert!(breaker.allows());
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.allows());
    }

    #[tokio::test]
    async fn test_priority_selection() {
        let registry = ServiceRegistry::new(CircuitBreakerSettings::default());
        registry
            .register(
                ServiceRegistration::new(
                    "fallback",
                    ServiceProvider::Communication(Arc::new(StubComm::new())),
                )
                .with_priority(ServicePriority::Fallback),
            )
            .await;
        registry
            .register(
                ServiceRegistration::new(
                    "primary",
                    ServiceProvider::Communication(Arc::new(StubComm::new())),
                )
                .with_priority(ServicePriority::High),
            )
            .await;

        let resolved = registry
            .get_communication("SpeakHandler", &[crate::domain::ports::CAP_SEND_MESSAGE])
            .await
            .expect("provider should resolve");
        assert_eq!(resolved.name, "primary");
    }

    #[tokio::test]
    async fn test_capability_filtering() {
        let registry = ServiceRegistry::new(CircuitBreakerSettings::default());
        let mut registration = ServiceRegistration::new(
            "no-send",
            ServiceProvider::Communication(Arc::new(StubComm::new())),
        );
        registration.capabilities = HashSet::from(["fetch_messages".to_string()]);
        registry.register(registration).await;

        assert!(registry
            .get_communication("SpeakHandler", &["send_message"])
            .await
            .is_none());
        assert!(registry
            .get_communication("SpeakHandler", &["fetch_messages"])
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_handler_scope_wins_over_global() {
        let registry = ServiceRegistry::new(CircuitBreakerSettings::default());
        registry
            .register(
                ServiceRegistration::new(
                    "global",
                    ServiceProvider::Communication(Arc::new(StubComm::new())),
                )
                .with_priority(ServicePriority::Critical),
            )
            .await;
        registry
            .register(
                ServiceRegistration::new(
                    "speak-only",
                    ServiceProvider::Communication(Arc::new(StubComm::new())),
                )
                .with_priority(ServicePriority::Low)
                .for_handler("SpeakHandler"),
            )
            .await;

        let for_speak = registry
            .get_communication("SpeakHandler", &["send_message"])
            .await
            .unwrap();
        assert_eq!(for_speak.name, "speak-only");

        let for_observe = registry
            .get_communication("ObserveHandler", &["send_message"])
            .await
            .unwrap();
        assert_eq!(for_observe.name, "global");
    }

    #[tokio::test]
    async fn test_unhealthy_provider_skipped() {
        let registry = ServiceRegistry::new(CircuitBreakerSettings::default());
        let sick = Arc::new(StubComm::new());
        sick.healthy.store(false, Ordering::Relaxed);
        registry
            .register(
                ServiceRegistration::new("sick", ServiceProvider::Communication(sick))
                    .with_priority(ServicePriority::Critical),
            )
            .await;
        registry
            .register(
                ServiceRegistration::new(
                    "backup",
                    ServiceProvider::Communication(Arc::new(StubComm::new())),
                )
                .with_priority(ServicePriority::Fallback),
            )
            .await;

        let resolved = registry
            .get_communication("SpeakHandler", &["send_message"])
            .await
            .unwrap();
        assert_eq!(resolved.name, "backup");
    }

    #[tokio::test]
    async fn test_open_circuit_fails_over() {
        let registry = ServiceRegistry::new(breaker_settings(1, 3600));
        registry
            .register(
                ServiceRegistration::new(
                    "primary",
                    ServiceProvider::Communication(Arc::new(StubComm::new())),
                )
                .with_priority(ServicePriority::High),
            )
            .await;
        registry
            .register(
                ServiceRegistration::new(
                    "backup",
                    ServiceProvider::Communication(Arc::new(StubComm::new())),
                )
                .with_priority(ServicePriority::Fallback),
            )
            .await;

        registry
            .record_failure(ServiceType::Communication, "primary")
            .await;
        assert_eq!(
            registry
                .circuit_state(ServiceType::Communication, "primary")
                .await,
            Some(CircuitState::Open)
        );

        let resolved = registry
            .get_communication("SpeakHandler", &["send_message"])
            .await
            .unwrap();
        assert_eq!(resolved.name, "backup");
    }

    #[tokio::test]
    async fn test_wait_ready() {
        let registry = Arc::new(ServiceRegistry::new(CircuitBreakerSettings::default()));

        // Nothing registered for the requested type: not ready.
        assert!(
            !registry
                .wait_ready(Duration::from_millis(50), Some(&[ServiceType::Communication]))
                .await
        );

        registry
            .register(ServiceRegistration::new(
                "cli",
                ServiceProvider::Communication(Arc::new(StubComm::new())),
            ))
            .await;
        assert!(
            registry
                .wait_ready(Duration::from_millis(50), Some(&[ServiceType::Communication]))
                .await
        );
    }

    #[tokio::test]
    async fn test_concurrent_breaker_updates_never_exceed_one_probe() {
        let breaker = Arc::new(CircuitBreaker::new(breaker_settings(1, 0)));
        breaker.record_failure();

        let admitted = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let breaker = Arc::clone(&breaker);
            let admitted = Arc::clone(&admitted);
            handles.push(tokio::spawn(async move {
                if breaker.allows() {
                    admitted.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(admitted.load(Ordering::SeqCst), 1, "exactly one probe");
    }
}

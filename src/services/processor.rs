//! Agent processor: the top-level cognitive scheduler.
//!
//! One state machine (WAKEUP, WORK, DREAM, SHUTDOWN) drives everything:
//! the wakeup ritual bootstraps identity, the work loop activates tasks,
//! seeds thoughts, and pushes them through the deliberation pipeline
//! with bounded concurrency, and shutdown drains in-flight work.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    AgentProfile, AppConfig, ProcessedThought, ProcessingQueueItem, Task, TaskStatus, Thought,
    ThoughtStatus,
};
use crate::domain::ports::Store;
use crate::services::context_builder::ContextBuilder;
use crate::services::dma::{DmaOrchestrator, EvaluationInput};
use crate::services::guardrails::GuardrailOrchestrator;
use crate::services::handlers::ActionDispatcher;
use crate::services::shutdown::ShutdownManager;
use crate::services::task_manager::TaskManager;

const WORK_TICK_MS: u64 = 100;
const DREAM_TICK_MS: u64 = 2_000;
/// Rounds a single wakeup step may consume before the ritual is treated
/// as stalled and the processor shuts down.
const WAKEUP_STEP_ROUND_CAP: u32 = 20;

/// Processor states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Wakeup,
    Work,
    Dream,
    Shutdown,
}

/// How the wakeup ritual ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeupOutcome {
    Completed,
    /// A step deferred, failed, or stalled; the processor must shut down.
    Deferred,
}

/// What one work tick accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub activated: usize,
    pub seeded: usize,
    pub processed: usize,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.activated == 0 && self.seeded == 0 && self.processed == 0
    }
}

/// The per-thought deliberation pipeline: context, evaluator fan-out,
/// action selection, guardrails. Dispatch happens in the processor so
/// the pipeline itself stays side-effect free.
pub struct ThoughtPipeline {
    store: Arc<dyn Store>,
    context_builder: Arc<ContextBuilder>,
    dma: Arc<DmaOrchestrator>,
    guardrails: Arc<GuardrailOrchestrator>,
}

impl ThoughtPipeline {
    pub fn new(
        store: Arc<dyn Store>,
        context_builder: Arc<ContextBuilder>,
        dma: Arc<DmaOrchestrator>,
        guardrails: Arc<GuardrailOrchestrator>,
    ) -> Self {
        Self {
            store,
            context_builder,
            dma,
            guardrails,
        }
    }

    pub fn profile(&self) -> &AgentProfile {
        self.context_builder.profile()
    }

    /// Run one queue item through the pipeline.
    ///
    /// Returns `None` when the thought vanished or was already claimed.
    /// The owning worker is the only writer of this thought's status
    /// from here on.
    pub async fn process(
        &self,
        item: &ProcessingQueueItem,
    ) -> DomainResult<Option<(Thought, ProcessedThought)>> {
        let Some(thought) = self.store.get_thought(&item.thought_id).await? else {
            warn!(thought_id = %item.thought_id, "queued thought no longer exists");
            return Ok(None);
        };
        if thought.status != ThoughtStatus::Pending {
            debug!(
                thought_id = %thought.id,
                status = thought.status.as_str(),
                "skipping thought that is no longer pending"
            );
            return Ok(None);
        }

        self.store
            .update_thought_status(&thought.id, ThoughtStatus::Processing, None, None, None)
            .await?;
        let mut thought = thought;
        thought.status = ThoughtStatus::Processing;

        let context = self.context_builder.build(&thought).await?;
        let input = EvaluationInput {
            thought: thought.clone(),
            context: context.clone(),
        };

        let dma_results = self.dma.run_initial_dmas(&input).await;
        let action = self
            .dma
            .run_action_selection(&thought, &context, dma_results, self.profile())
            .await;

        // Terminal actions may bypass the guardrail pass; everything
        // else is vetted and possibly overridden to PONDER.
        let processed = if action.selected_action.is_terminal() {
            ProcessedThought {
                action_result: action,
                guardrail_result: None,
            }
        } else {
            let guardrail_result = self
                .guardrails
                .apply_guardrails(action.clone(), &thought, context.identity.clone())
                .await;
            ProcessedThought {
                action_result: action,
                guardrail_result: Some(guardrail_result),
            }
        };

        Ok(Some((thought, processed)))
    }
}

async fn process_one(
    pipeline: Arc<ThoughtPipeline>,
    dispatcher: Arc<ActionDispatcher>,
    store: Arc<dyn Store>,
    item: ProcessingQueueItem,
) -> bool {
    match pipeline.process(&item).await {
        Ok(Some((thought, processed))) => {
            if let Err(e) = dispatcher.dispatch(&processed, &thought).await {
                // Handlers leave the thought terminal before erroring;
                // nothing to repair here.
                error!(thought_id = %thought.id, error = %e, "dispatch failed");
            }
            true
        }
        Ok(None) => false,
        Err(e) => {
            error!(thought_id = %item.thought_id, error = %e, "pipeline failed");
            let repaired = store
                .update_thought_status(&item.thought_id, ThoughtStatus::Failed, None, None, None)
                .await;
            if let Err(repair_err) = repaired {
                error!(
                    thought_id = %item.thought_id,
                    error = %repair_err,
                    "could not mark failed thought terminal"
                );
            }
            true
        }
    }
}

/// Top-level processor loop.
pub struct AgentProcessor {
    store: Arc<dyn Store>,
    task_manager: Arc<TaskManager>,
    pipeline: Arc<ThoughtPipeline>,
    dispatcher: Arc<ActionDispatcher>,
    shutdown: Arc<ShutdownManager>,
    config: Arc<AppConfig>,
    state: ProcessorState,
    round_number: i32,
    idle_ticks: u32,
    queue_tx: mpsc::Sender<ProcessingQueueItem>,
    queue_rx: mpsc::Receiver<ProcessingQueueItem>,
}

impl AgentProcessor {
    pub fn new(
        store: Arc<dyn Store>,
        task_manager: Arc<TaskManager>,
        pipeline: Arc<ThoughtPipeline>,
        dispatcher: Arc<ActionDispatcher>,
        shutdown: Arc<ShutdownManager>,
        config: Arc<AppConfig>,
    ) -> Self {
        // The queue between feeder and workers is bounded by design;
        // overflow pauses the feeder for the tick.
        let (queue_tx, queue_rx) = mpsc::channel(config.workflow.queue_capacity.max(1));
        Self {
            store,
            task_manager,
            pipeline,
            dispatcher,
            shutdown,
            config,
            state: ProcessorState::Wakeup,
            round_number: 0,
            idle_ticks: 0,
            queue_tx,
            queue_rx,
        }
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn round_number(&self) -> i32 {
        self.round_number
    }

    /// Run the ritual, then the work loop, until shutdown.
    pub async fn run(&mut self, wakeup_channel_id: Option<&str>) -> DomainResult<()> {
        if self.run_wakeup(wakeup_channel_id).await? == WakeupOutcome::Deferred {
            self.drain_and_stop().await;
            return Ok(());
        }
        self.task_manager.ensure_monitor_task().await?;

        loop {
            if self.shutdown.is_global_shutdown_requested() {
                self.state = ProcessorState::Shutdown;
            }
            match self.state {
                ProcessorState::Work | ProcessorState::Wakeup => {
                    self.tick().await?;
                    tokio::time::sleep(std::time::Duration::from_millis(WORK_TICK_MS)).await;
                }
                ProcessorState::Dream => {
                    self.dream_tick().await?;
                }
                ProcessorState::Shutdown => break,
            }
        }
        self.drain_and_stop().await;
        Ok(())
    }

    /// Execute the wakeup ritual: each step task is seeded and processed
    /// in order, advancing only once the step completes (which requires
    /// a COMPLETED SPEAK correlation, enforced at TASK_COMPLETE). Any
    /// deferred, failed, or stalled step sends the processor to
    /// SHUTDOWN.
    pub async fn run_wakeup(
        &mut self,
        channel_id: Option<&str>,
    ) -> DomainResult<WakeupOutcome> {
        self.state = ProcessorState::Wakeup;
        let identity = self.pipeline.profile().identity.clone();
        let tasks = self
            .task_manager
            .create_wakeup_sequence_tasks(channel_id, &identity)
            .await?;

        for step in &tasks[1..] {
            info!(
                task_id = %step.id,
                step = ?step.context.step_type,
                "starting wakeup step"
            );
            let mut rounds = 0u32;
            loop {
                if self.shutdown.is_global_shutdown_requested() {
                    self.state = ProcessorState::Shutdown;
                    return Ok(WakeupOutcome::Deferred);
                }

                let Some(task) = self.store.get_task(&step.id).await? else {
                    error!(task_id = %step.id, "wakeup step task missing");
                    self.state = ProcessorState::Shutdown;
                    return Ok(WakeupOutcome::Deferred);
                };
                match task.status {
                    TaskStatus::Completed => break,
                    TaskStatus::Deferred | TaskStatus::Failed | TaskStatus::Rejected => {
                        warn!(
                            task_id = %task.id,
                            status = task.status.as_str(),
                            "wakeup step did not complete; shutting down"
                        );
                        self.state = ProcessorState::Shutdown;
                        return Ok(WakeupOutcome::Deferred);
                    }
                    TaskStatus::Pending | TaskStatus::Active => {}
                }

                self.seed_step_thought(&task).await?;
                self.process_batch().await?;
                self.round_number += 1;

                rounds += 1;
                if rounds >= WAKEUP_STEP_ROUND_CAP {
                    warn!(task_id = %step.id, rounds, "wakeup step stalled");
                    self.state = ProcessorState::Shutdown;
                    return Ok(WakeupOutcome::Deferred);
                }
            }
        }

        info!("wakeup ritual completed");
        self.state = ProcessorState::Work;
        Ok(WakeupOutcome::Completed)
    }

    async fn seed_step_thought(&self, task: &Task) -> DomainResult<()> {
        let thoughts = self.store.get_thoughts_by_task(&task.id).await?;
        if thoughts.iter().all(|t| t.status.is_terminal()) {
            self.store
                .add_thought(&Thought::seed(task, self.round_number))
                .await?;
        }
        Ok(())
    }

    /// One WORK tick: activate, seed, drain the queue, dispatch.
    pub async fn tick(&mut self) -> DomainResult<TickReport> {
        if self.shutdown.is_global_shutdown_requested() {
            self.state = ProcessorState::Shutdown;
            return Ok(TickReport::default());
        }

        let activated = self.task_manager.activate_pending_tasks().await?;
        let seeded = self.seed_thoughts().await?;
        let processed = self.process_batch().await?;
        self.round_number += 1;

        let report = TickReport {
            activated,
            seeded,
            processed,
        };

        if report.is_idle() {
            self.idle_ticks += 1;
            if let Some(threshold) = self.config.workflow.dream_after_idle_ticks {
                if self.state == ProcessorState::Work && self.idle_ticks >= threshold {
                    info!(idle_ticks = self.idle_ticks, "entering dream mode");
                    self.state = ProcessorState::Dream;
                }
            }
        } else {
            self.idle_ticks = 0;
        }
        Ok(report)
    }

    /// Low-intensity mode: wake rarely, return to WORK when anything is
    /// waiting.
    async fn dream_tick(&mut self) -> DomainResult<()> {
        tokio::time::sleep(std::time::Duration::from_millis(DREAM_TICK_MS)).await;
        let waiting = self.task_manager.pending_task_count().await?
            + self.store.count_tasks(TaskStatus::Active).await?;
        if waiting > 0 {
            info!("observations waiting; leaving dream mode");
            self.state = ProcessorState::Work;
            self.idle_ticks = 0;
        }
        Ok(())
    }

    async fn seed_thoughts(&self) -> DomainResult<usize> {
        let tasks = self
            .task_manager
            .get_tasks_needing_seed(self.config.workflow.batch_size)
            .await?;
        let mut seeded = 0;
        for task in tasks {
            self.store
                .add_thought(&Thought::seed(&task, self.round_number))
                .await?;
            debug!(task_id = %task.id, "seeded thought");
            seeded += 1;
        }
        Ok(seeded)
    }

    /// Fill the bounded queue from the store, then drain it with up to
    /// `max_inflight_thoughts` workers. Each thought has exactly one
    /// owning worker.
    async fn process_batch(&mut self) -> DomainResult<usize> {
        let pending = self
            .store
            .get_pending_thoughts(self.config.workflow.batch_size)
            .await?;
        for queued in pending {
            let item = ProcessingQueueItem::from_thought(&queued.thought, queued.task_priority);
            if self.queue_tx.try_send(item).is_err() {
                // Queue full; the rest stays in the store for the next
                // tick.
                break;
            }
        }

        let semaphore = Arc::new(Semaphore::new(
            self.config.workflow.max_inflight_thoughts.max(1),
        ));
        let mut workers: JoinSet<bool> = JoinSet::new();
        while let Ok(item) = self.queue_rx.try_recv() {
            if self.shutdown.is_global_shutdown_requested() {
                // Stop pulling new items; whatever stays queued is
                // re-discoverable from the store.
                break;
            }
            let semaphore = Arc::clone(&semaphore);
            let pipeline = Arc::clone(&self.pipeline);
            let dispatcher = Arc::clone(&self.dispatcher);
            let store = Arc::clone(&self.store);
            workers.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("inflight semaphore closed");
                process_one(pipeline, dispatcher, store, item).await
            });
        }

        let mut processed = 0;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(true) => processed += 1,
                Ok(false) => {}
                Err(e) => error!(error = %e, "pipeline worker panicked"),
            }
        }
        Ok(processed)
    }

    async fn drain_and_stop(&mut self) {
        self.state = ProcessorState::Shutdown;
        // In-flight work is already joined by process_batch; run the
        // registered async hooks and stop.
        self.shutdown.run_async_hooks().await;
        info!(
            reason = self.shutdown.shutdown_reason().as_deref().unwrap_or("normal exit"),
            "agent processor stopped"
        );
    }
}

//! Ponder manager: bounded re-deliberation.
//!
//! A PONDER appends the new questions to the thought's notes and sends
//! it back to PENDING for another pipeline pass. Once the next pass
//! would exceed `max_ponder_rounds`, the thought is deferred instead and
//! its (non-protected) parent task follows.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{AppConfig, EpistemicData, TaskStatus, Thought, ThoughtStatus};
use crate::domain::ports::Store;

/// Outcome of handling one PONDER action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PonderOutcome {
    /// The thought went back to PENDING for another round.
    Requeued { ponder_count: u32 },
    /// The deliberation bound was hit; the thought is DEFERRED.
    DeferredAtLimit,
}

/// Bounds deliberation and escalates at the limit.
pub struct PonderManager {
    store: Arc<dyn Store>,
    config: Arc<AppConfig>,
}

impl PonderManager {
    pub fn new(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    pub fn max_ponder_rounds(&self) -> u32 {
        self.config.workflow.max_ponder_rounds
    }

    /// Process a PONDER on `thought` with freshly raised `questions`.
    ///
    /// Epistemic signals from a guardrail override are folded into the
    /// question list so the next round sees them.
    pub async fn handle_ponder(
        &self,
        thought: &Thought,
        mut questions: Vec<String>,
        epistemic_data: Option<&EpistemicData>,
    ) -> DomainResult<PonderOutcome> {
        if let Some(data) = epistemic_data {
            if let Some(veto) = &data.optimization_veto {
                questions.push(format!(
                    "Optimization veto ({:?}): {}",
                    veto.decision, veto.justification
                ));
            }
            if let Some(humility) = &data.epistemic_humility {
                questions.push(format!(
                    "Humility recommends {} (certainty {:.2})",
                    humility.recommended_action, humility.epistemic_certainty
                ));
            }
        }

        let mut notes = thought.ponder_notes.clone();
        notes.extend(questions);

        let max_rounds = self.max_ponder_rounds();
        if thought.ponder_count + 1 >= max_rounds {
            warn!(
                thought_id = %thought.id,
                ponder_count = thought.ponder_count,
                max_rounds,
                "max ponder rounds reached; deferring thought"
            );
            // Task first, then the thought, so the deferred thought is
            // never observable ahead of its deferred task.
            if self.config.is_protected_task(&thought.source_task_id) {
                info!(
                    task_id = %thought.source_task_id,
                    "protected task exempt from ponder-limit deferral"
                );
            } else {
                self.store
                    .update_task_status(&thought.source_task_id, TaskStatus::Deferred)
                    .await?;
            }
            self.store
                .update_thought_status(
                    &thought.id,
                    ThoughtStatus::Deferred,
                    None,
                    None,
                    Some(&notes),
                )
                .await?;
            return Ok(PonderOutcome::DeferredAtLimit);
        }

        let new_count = thought.ponder_count + 1;
        info!(
            thought_id = %thought.id,
            ponder_count = new_count,
            "re-queueing thought for another deliberation round"
        );
        self.store
            .update_thought_status(
                &thought.id,
                ThoughtStatus::Pending,
                None,
                Some(new_count),
                Some(&notes),
            )
            .await?;
        Ok(PonderOutcome::Requeued {
            ponder_count: new_count,
        })
    }
}

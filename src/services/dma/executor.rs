//! Shared retry wrapper for evaluator invocations.
//!
//! Every evaluator call goes through [`run_with_retries`]. Exhausting the
//! retry budget yields an escalation value instead of an error, so the
//! orchestrator can carry partial failures forward without unwinding.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::domain::errors::DomainResult;
use crate::domain::models::DmaFailure;

const INITIAL_BACKOFF_MS: u64 = 50;
const MAX_BACKOFF_MS: u64 = 1_000;

/// Outcome of a retried evaluator invocation.
#[derive(Debug)]
pub enum EvaluatorOutcome<T> {
    Ok(T),
    /// The evaluator exhausted its retries; the failure is recorded and
    /// the slot is carried forward as missing.
    Escalated(DmaFailure),
}

impl<T> EvaluatorOutcome<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            Self::Escalated(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&DmaFailure> {
        match self {
            Self::Ok(_) => None,
            Self::Escalated(failure) => Some(failure),
        }
    }
}

/// Run an evaluator up to `retry_limit` times with exponential backoff
/// between attempts. Never panics, never propagates: exhaustion becomes
/// an [`EvaluatorOutcome::Escalated`] carrying the last error.
pub async fn run_with_retries<T, F, Fut>(
    evaluator: &str,
    retry_limit: u32,
    mut attempt_fn: F,
) -> EvaluatorOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DomainResult<T>>,
{
    let attempts = retry_limit.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match attempt_fn().await {
            Ok(value) => return EvaluatorOutcome::Ok(value),
            Err(e) => {
                warn!(evaluator, attempt, error = %e, "evaluator attempt failed");
                last_error = e.to_string();
            }
        }
        if attempt < attempts {
            let backoff_ms = INITIAL_BACKOFF_MS
                .saturating_mul(2_u64.saturating_pow(attempt - 1))
                .min(MAX_BACKOFF_MS);
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        }
    }

    EvaluatorOutcome::Escalated(DmaFailure {
        evaluator: evaluator.to_string(),
        message: format!("exhausted {attempts} attempts: {last_error}"),
    })
}

//! Decision-making evaluator result models.

use serde::{Deserialize, Serialize};

use super::action::ActionSelectionResult;

/// LLM resource accounting attached to evaluator results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    #[serde(default)]
    pub tokens_input: u64,
    #[serde(default)]
    pub tokens_output: u64,
    #[serde(default)]
    pub cost_cents: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
}

impl ResourceUsage {
    pub fn tokens_total(&self) -> u64 {
        self.tokens_input + self.tokens_output
    }
}

/// Verdict of the ethical evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EthicalVerdict {
    /// The contemplated response aligns with the agent's principles
    Approve,
    /// Alignment concerns exist but do not block
    Caution,
    /// Escalation to a wise authority is advised
    Defer,
    /// The contemplated response conflicts with core principles
    Reject,
}

/// Result of the ethical evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EthicalResult {
    pub verdict: EthicalVerdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Per-principle alignment notes.
    #[serde(default)]
    pub alignment_check: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_usage: Option<ResourceUsage>,
}

/// Result of the common-sense evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonSenseResult {
    /// 0.0 = physically/socially implausible, 1.0 = fully plausible.
    pub plausibility_score: f32,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_usage: Option<ResourceUsage>,
}

/// Result of the domain-specific evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSpecificResult {
    pub domain: String,
    /// 0.0 = off-domain or harmful, 1.0 = exemplary domain behavior.
    pub score: f32,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_usage: Option<ResourceUsage>,
}

/// A recorded evaluator failure after retry exhaustion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmaFailure {
    pub evaluator: String,
    pub message: String,
}

/// Container for the parallel evaluator fan-out.
///
/// Partial failure is not fatal: a failed evaluator leaves its slot
/// `None` and records an entry under `errors`; action selection sees the
/// degraded input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DmaResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethical: Option<EthicalResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csdma: Option<CommonSenseResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsdma: Option<DomainSpecificResult>,
    #[serde(default)]
    pub errors: Vec<DmaFailure>,
}

impl DmaResults {
    /// Whether every registered evaluator produced a result.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// One-line summaries suitable for deferral packages and prompts.
    pub fn ethical_summary(&self) -> Option<String> {
        self.ethical.as_ref().map(|e| {
            format!(
                "verdict={:?}{}",
                e.verdict,
                e.rationale.as_deref().map(|r| format!(": {r}")).unwrap_or_default()
            )
        })
    }

    pub fn common_sense_summary(&self) -> Option<String> {
        self.csdma.as_ref().map(|c| {
            if c.flags.is_empty() {
                format!("plausibility={:.2}", c.plausibility_score)
            } else {
                format!("plausibility={:.2} flags=[{}]", c.plausibility_score, c.flags.join(", "))
            }
        })
    }

    pub fn domain_summary(&self) -> Option<String> {
        self.dsdma
            .as_ref()
            .map(|d| format!("domain={} score={:.2}", d.domain, d.score))
    }
}

/// A fully processed thought: the selected action plus guardrail data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedThought {
    pub action_result: ActionSelectionResult,
    /// `None` only for terminal actions that bypass guardrails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardrail_result: Option<super::processing::GuardrailResult>,
}

impl ProcessedThought {
    /// The action the dispatcher must route on.
    pub fn final_action(&self) -> &ActionSelectionResult {
        self.guardrail_result
            .as_ref()
            .map_or(&self.action_result, |g| &g.final_action)
    }
}

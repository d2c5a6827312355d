//! Guardrail outcome and epistemic signal models.

use serde::{Deserialize, Serialize};

use super::action::ActionSelectionResult;

/// Decision of the optimization-veto faculty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VetoDecision {
    Proceed,
    Abort,
    Defer,
}

/// Optimization-veto faculty output: vetoes actions that trade core
/// values for narrow optimization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationVeto {
    pub decision: VetoDecision,
    pub justification: String,
}

/// Epistemic-humility faculty output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpistemicHumility {
    /// What the faculty recommends: "proceed", "abort", or "defer".
    pub recommended_action: String,
    #[serde(default)]
    pub epistemic_certainty: f32,
    #[serde(default)]
    pub identified_uncertainties: Vec<String>,
}

/// Epistemic signals measured by guardrail faculties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpistemicData {
    /// Response disorder; high entropy reads as incoherent rambling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entropy: Option<f32>,
    /// Alignment with the agent's own voice and principles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coherence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimization_veto: Option<OptimizationVeto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epistemic_humility: Option<EpistemicHumility>,
}

/// Verdict of a single guardrail check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuardrailCheck {
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epistemic_data: Option<EpistemicData>,
}

impl GuardrailCheck {
    pub fn pass() -> Self {
        Self {
            passed: true,
            reason: None,
            epistemic_data: None,
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: Some(reason.into()),
            epistemic_data: None,
        }
    }

    pub fn with_epistemic_data(mut self, data: EpistemicData) -> Self {
        self.epistemic_data = Some(data);
        self
    }
}

/// Result of the full guardrail pass over a selected action.
///
/// Guardrail override is the only path by which a selected action becomes
/// a different action before dispatch; an overridden final action is
/// always PONDER.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailResult {
    pub original_action: ActionSelectionResult,
    pub final_action: ActionSelectionResult,
    #[serde(default)]
    pub overridden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epistemic_data: Option<EpistemicData>,
}

impl GuardrailResult {
    /// An untouched pass-through result.
    pub fn passed(action: ActionSelectionResult, epistemic_data: Option<EpistemicData>) -> Self {
        Self {
            original_action: action.clone(),
            final_action: action,
            overridden: false,
            override_reason: None,
            epistemic_data,
        }
    }
}

//! Deferral package sent to the wise authority.

use serde::{Deserialize, Serialize};

/// Everything a human overseer needs to review a deferred thought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferralPackage {
    pub thought_id: String,
    pub task_id: String,
    pub reason: String,
    pub thought_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethical_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_sense_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_summary: Option<String>,
}

impl DeferralPackage {
    pub fn new(
        thought_id: impl Into<String>,
        task_id: impl Into<String>,
        reason: impl Into<String>,
        thought_content: impl Into<String>,
    ) -> Self {
        Self {
            thought_id: thought_id.into(),
            task_id: task_id.into(),
            reason: reason.into(),
            thought_content: thought_content.into(),
            task_description: None,
            ethical_summary: None,
            common_sense_summary: None,
            domain_summary: None,
        }
    }
}

/// Context for a guidance request to the wise authority.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuidanceContext {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_id: Option<String>,
}

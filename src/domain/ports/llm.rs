//! LLM service port.
//!
//! The runtime core only sees this structured completion primitive; the
//! evaluators and guardrail faculties build prompts on top of it and the
//! embedder supplies the actual backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::ResourceUsage;

/// A structured completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl LlmRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            max_tokens: None,
            temperature: None,
        }
    }
}

/// A structured completion: the model's answer as JSON plus accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_usage: Option<ResourceUsage>,
}

/// Structured completion backend.
#[async_trait]
pub trait LlmService: Send + Sync {
    async fn generate_structured(&self, request: &LlmRequest) -> DomainResult<LlmResponse>;

    async fn is_healthy(&self) -> bool {
        true
    }
}

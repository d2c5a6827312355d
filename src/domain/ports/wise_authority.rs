//! Wise authority port: the human-oversight escalation channel.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{DeferralPackage, GuidanceContext};

/// Deferral delivery and guidance retrieval.
#[async_trait]
pub trait WiseAuthorityService: Send + Sync {
    async fn send_deferral(&self, package: &DeferralPackage) -> DomainResult<()>;

    /// Ask for guidance; `None` when no guidance is available yet.
    async fn fetch_guidance(&self, context: &GuidanceContext) -> DomainResult<Option<String>>;

    async fn is_healthy(&self) -> bool {
        true
    }
}

//! Memory service port: the external graph memory.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{GraphNode, MemoryOpResult};

pub const CAP_MEMORIZE: &str = "memorize";
pub const CAP_RECALL: &str = "recall";
pub const CAP_FORGET: &str = "forget";

/// Graph memory operations. Status semantics are policy outcomes, not
/// transport errors: a provider may answer `Denied` or `Deferred`.
#[async_trait]
pub trait MemoryService: Send + Sync {
    async fn memorize(&self, node: &GraphNode) -> DomainResult<MemoryOpResult>;

    async fn recall(&self, node: &GraphNode) -> DomainResult<MemoryOpResult>;

    async fn forget(&self, node: &GraphNode) -> DomainResult<MemoryOpResult>;

    async fn is_healthy(&self) -> bool {
        true
    }
}

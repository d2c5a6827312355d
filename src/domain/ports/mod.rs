//! Domain ports (interfaces) for the agent runtime.
//!
//! Everything outside the cognitive core (persistence, messaging,
//! memory, tools, oversight, auditing, the LLM backend) is reached
//! through these traits.

pub mod audit;
pub mod communication;
pub mod llm;
pub mod memory;
pub mod store;
pub mod tool;
pub mod wise_authority;

pub use audit::{AuditContext, AuditService};
pub use communication::{CommunicationService, CAP_FETCH_MESSAGES, CAP_SEND_MESSAGE};
pub use llm::{LlmRequest, LlmResponse, LlmService};
pub use memory::{MemoryService, CAP_FORGET, CAP_MEMORIZE, CAP_RECALL};
pub use store::{QueuedThought, Store};
pub use tool::{ToolService, CAP_EXECUTE_TOOL};
pub use wise_authority::WiseAuthorityService;

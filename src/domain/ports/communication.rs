//! Communication service port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::FetchedMessage;

/// Capability every SPEAK-capable provider must advertise.
pub const CAP_SEND_MESSAGE: &str = "send_message";
/// Capability for active observation.
pub const CAP_FETCH_MESSAGES: &str = "fetch_messages";

/// Outbound and inbound messaging through one channel-addressed medium.
#[async_trait]
pub trait CommunicationService: Send + Sync {
    async fn send_message(&self, channel_id: &str, content: &str) -> DomainResult<()>;

    async fn fetch_messages(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> DomainResult<Vec<FetchedMessage>>;

    async fn is_healthy(&self) -> bool {
        true
    }

    /// Capabilities this provider advertises; used as the registration
    /// default when the registrar does not override them.
    fn capabilities(&self) -> Vec<String> {
        vec![CAP_SEND_MESSAGE.to_string(), CAP_FETCH_MESSAGES.to_string()]
    }
}

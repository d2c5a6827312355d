//! Message shapes exchanged with communication adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An observation arriving from the outside world.
///
/// Adapters translate their native payloads into this shape; the task
/// manager turns each one into a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub message_id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl IncomingMessage {
    pub fn new(
        message_id: impl Into<String>,
        author_id: impl Into<String>,
        author_name: impl Into<String>,
        content: impl Into<String>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            author_id: author_id.into(),
            author_name: author_name.into(),
            content: content.into(),
            channel_id: Some(channel_id.into()),
            reference_message_id: None,
            timestamp: Some(Utc::now()),
        }
    }
}

/// Message returned by `CommunicationService::fetch_messages`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchedMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_bot: bool,
}

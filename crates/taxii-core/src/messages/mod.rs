//! Versioned TAXII wire message sets.
//!
//! Each protocol version has its own closed message enum; [`VersionedMessage`]
//! is the sealed union the transport and transform layers pass around.

pub mod tm10;
pub mod tm11;

use crate::version::ProtocolVersion;
use crate::{Result, TaxiiError};

/// Version-independent message kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Discovery request
    DiscoveryRequest,
    /// Discovery response
    DiscoveryResponse,
    /// Collection (1.1) or feed (1.0) information request
    CollectionInformationRequest,
    /// Collection (1.1) or feed (1.0) information response
    CollectionInformationResponse,
    /// Subscription management request
    ManageSubscriptionRequest,
    /// Subscription management response
    ManageSubscriptionResponse,
    /// Poll request
    PollRequest,
    /// Poll response
    PollResponse,
    /// Inbox message
    InboxMessage,
    /// Status message
    StatusMessage,
}

impl MessageKind {
    /// Returns true for messages a client sends to a service
    #[must_use]
    pub const fn is_request(self) -> bool {
        matches!(
            self,
            Self::DiscoveryRequest
                | Self::CollectionInformationRequest
                | Self::ManageSubscriptionRequest
                | Self::PollRequest
                | Self::InboxMessage
        )
    }
}

/// A message of either supported TAXII version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionedMessage {
    /// TAXII 1.0
    V10(tm10::Message),
    /// TAXII 1.1
    V11(tm11::Message),
}

impl VersionedMessage {
    /// Protocol version of the message
    #[must_use]
    pub const fn version(&self) -> ProtocolVersion {
        match self {
            Self::V10(_) => ProtocolVersion::V10,
            Self::V11(_) => ProtocolVersion::V11,
        }
    }

    /// Message id
    #[must_use]
    pub fn message_id(&self) -> &str {
        match self {
            Self::V10(m) => m.message_id(),
            Self::V11(m) => m.message_id(),
        }
    }

    /// Request message id, for responses
    #[must_use]
    pub fn in_response_to(&self) -> Option<&str> {
        match self {
            Self::V10(m) => m.in_response_to(),
            Self::V11(m) => m.in_response_to(),
        }
    }

    /// Version-independent kind
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::V10(m) => match m {
                tm10::Message::DiscoveryRequest(_) => MessageKind::DiscoveryRequest,
                tm10::Message::DiscoveryResponse(_) => MessageKind::DiscoveryResponse,
                tm10::Message::FeedInformationRequest(_) => {
                    MessageKind::CollectionInformationRequest
                }
                tm10::Message::FeedInformationResponse(_) => {
                    MessageKind::CollectionInformationResponse
                }
                tm10::Message::ManageFeedSubscriptionRequest(_) => {
                    MessageKind::ManageSubscriptionRequest
                }
                tm10::Message::ManageFeedSubscriptionResponse(_) => {
                    MessageKind::ManageSubscriptionResponse
                }
                tm10::Message::PollRequest(_) => MessageKind::PollRequest,
                tm10::Message::PollResponse(_) => MessageKind::PollResponse,
                tm10::Message::InboxMessage(_) => MessageKind::InboxMessage,
                tm10::Message::StatusMessage(_) => MessageKind::StatusMessage,
            },
            Self::V11(m) => match m {
                tm11::Message::DiscoveryRequest(_) => MessageKind::DiscoveryRequest,
                tm11::Message::DiscoveryResponse(_) => MessageKind::DiscoveryResponse,
                tm11::Message::CollectionInformationRequest(_) => {
                    MessageKind::CollectionInformationRequest
                }
                tm11::Message::CollectionInformationResponse(_) => {
                    MessageKind::CollectionInformationResponse
                }
                tm11::Message::ManageCollectionSubscriptionRequest(_) => {
                    MessageKind::ManageSubscriptionRequest
                }
                tm11::Message::ManageCollectionSubscriptionResponse(_) => {
                    MessageKind::ManageSubscriptionResponse
                }
                tm11::Message::PollRequest(_) => MessageKind::PollRequest,
                tm11::Message::PollResponse(_) => MessageKind::PollResponse,
                tm11::Message::InboxMessage(_) => MessageKind::InboxMessage,
                tm11::Message::StatusMessage(_) => MessageKind::StatusMessage,
            },
        }
    }

    /// Check the structural rules of the message's version
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::V10(m) => m.validate(),
            Self::V11(m) => m.validate(),
        }
    }
}

impl From<tm10::Message> for VersionedMessage {
    fn from(message: tm10::Message) -> Self {
        Self::V10(message)
    }
}

impl From<tm11::Message> for VersionedMessage {
    fn from(message: tm11::Message) -> Self {
        Self::V11(message)
    }
}

/// Reject empty or whitespace-only required fields.
pub(crate) fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TaxiiError::BadMessage(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Message ids additionally must not contain whitespace.
pub(crate) fn require_id(field: &str, value: &str) -> Result<()> {
    require(field, value)?;
    if value.chars().any(char::is_whitespace) {
        return Err(TaxiiError::BadMessage(format!(
            "{field} must not contain whitespace"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_and_collection_requests_share_a_kind() {
        let v10: VersionedMessage = tm10::Message::FeedInformationRequest(
            tm10::FeedInformationRequest {
                message_id: "1".into(),
            },
        )
        .into();
        let v11: VersionedMessage = tm11::Message::CollectionInformationRequest(
            tm11::CollectionInformationRequest {
                message_id: "1".into(),
            },
        )
        .into();

        assert_eq!(v10.kind(), v11.kind());
        assert_ne!(v10.version(), v11.version());
        assert!(v10.kind().is_request());
    }

    #[test]
    fn test_message_id_with_whitespace_is_invalid() {
        let msg: VersionedMessage = tm11::Message::DiscoveryRequest(tm11::DiscoveryRequest {
            message_id: "a b".into(),
        })
        .into();
        assert!(matches!(msg.validate(), Err(TaxiiError::BadMessage(_))));
    }
}

//! TAXII 1.0 message set ("feed" semantics).
//!
//! Content bindings are bare identifiers here, there are no subtypes,
//! collection types, volumes or destination collection names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::StatusType;
use crate::{Result, TaxiiError};

use super::{require, require_id};

/// TAXII 1.0 service types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    /// Discovery service
    Discovery,
    /// Feed management service
    FeedManagement,
    /// Poll service
    Poll,
    /// Inbox service
    Inbox,
}

/// Feed subscription actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Create
    Subscribe,
    /// End
    Unsubscribe,
    /// Report
    Status,
}

/// Content block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Binding id
    pub content_binding: String,
    /// Raw payload
    pub content: String,
    /// Timestamp label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_label: Option<DateTime<Utc>>,
    /// Padding (ignored)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<String>,
}

/// Discovery response entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Service kind
    pub service_type: ServiceType,
    /// Services specification version
    pub services_version: String,
    /// Protocol binding
    pub protocol_binding: String,
    /// Absolute address
    pub service_address: String,
    /// Message bindings
    pub message_bindings: Vec<String>,
    /// Accepted content for inbox services
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inbox_service_accepted_content: Vec<String>,
    /// Availability
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Poll endpoint of a feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingServiceInstance {
    /// Protocol binding
    pub poll_protocol: String,
    /// Address
    pub poll_address: String,
    /// Message bindings
    pub poll_message_bindings: Vec<String>,
}

/// Subscription endpoint of a feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionMethod {
    /// Protocol binding
    pub subscription_protocol: String,
    /// Address
    pub subscription_address: String,
    /// Message bindings
    pub subscription_message_bindings: Vec<String>,
}

/// Inbox endpoint of a feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivingInboxService {
    /// Protocol binding
    pub inbox_protocol: String,
    /// Address
    pub inbox_address: String,
    /// Message bindings
    pub inbox_message_bindings: Vec<String>,
    /// Accepted content, empty means any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_contents: Vec<String>,
}

/// Feed description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedInformation {
    /// Name
    pub feed_name: String,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_description: Option<String>,
    /// Supported content, empty means any
    #[serde(default)]
    pub supported_contents: Vec<String>,
    /// Availability
    pub available: bool,
    /// Poll endpoints
    #[serde(default)]
    pub polling_service_instances: Vec<PollingServiceInstance>,
    /// Subscription endpoints
    #[serde(default)]
    pub subscription_methods: Vec<SubscriptionMethod>,
    /// Inbox endpoints
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub receiving_inbox_services: Vec<ReceivingInboxService>,
}

/// Where subscribed content is delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryParameters {
    /// Protocol binding of the target inbox
    pub inbox_protocol: String,
    /// Address of the target inbox
    pub inbox_address: String,
    /// Message binding to deliver with
    pub delivery_message_binding: String,
    /// Requested bindings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_bindings: Vec<String>,
}

/// Poll endpoint of a subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollInstance {
    /// Protocol binding
    pub poll_protocol: String,
    /// Address
    pub poll_address: String,
    /// Message bindings
    #[serde(default)]
    pub poll_message_bindings: Vec<String>,
}

/// Subscription state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionInstance {
    /// Subscription id
    pub subscription_id: String,
    /// Delivery targets
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delivery_parameters: Vec<DeliveryParameters>,
    /// Poll endpoints
    #[serde(default)]
    pub poll_instances: Vec<PollInstance>,
}

/// Subscription context of pushed content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionInformation {
    /// Source feed
    pub feed_name: String,
    /// Subscription id
    pub subscription_id: String,
    /// Window start
    pub inclusive_begin_timestamp_label: DateTime<Utc>,
    /// Window end
    pub inclusive_end_timestamp_label: DateTime<Utc>,
}

/// Discovery request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    /// Message id
    pub message_id: String,
}

/// Discovery response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryResponse {
    /// Message id
    pub message_id: String,
    /// Request message id
    pub in_response_to: String,
    /// Advertised instances
    #[serde(default)]
    pub service_instances: Vec<ServiceInstance>,
}

/// Feed information request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedInformationRequest {
    /// Message id
    pub message_id: String,
}

/// Feed information response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedInformationResponse {
    /// Message id
    pub message_id: String,
    /// Request message id
    pub in_response_to: String,
    /// Feeds
    #[serde(default)]
    pub feed_informations: Vec<FeedInformation>,
}

/// Feed subscription request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManageFeedSubscriptionRequest {
    /// Message id
    pub message_id: String,
    /// Feed name
    pub feed_name: String,
    /// Requested action
    pub action: Action,
    /// Target subscription
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    /// Delivery target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_parameters: Option<DeliveryParameters>,
}

/// Feed subscription response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManageFeedSubscriptionResponse {
    /// Message id
    pub message_id: String,
    /// Request message id
    pub in_response_to: String,
    /// Feed name
    pub feed_name: String,
    /// Optional message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Affected subscriptions
    #[serde(default)]
    pub subscription_instances: Vec<SubscriptionInstance>,
}

/// Poll request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollRequest {
    /// Message id
    pub message_id: String,
    /// Feed name
    pub feed_name: String,
    /// Window start (exclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_begin_timestamp_label: Option<DateTime<Utc>>,
    /// Window end (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusive_end_timestamp_label: Option<DateTime<Utc>>,
    /// Poll for this subscription
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    /// Requested bindings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_bindings: Vec<String>,
}

/// Poll response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResponse {
    /// Message id
    pub message_id: String,
    /// Request message id
    pub in_response_to: String,
    /// Feed name
    pub feed_name: String,
    /// Window start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusive_begin_timestamp_label: Option<DateTime<Utc>>,
    /// Window end
    pub inclusive_end_timestamp_label: DateTime<Utc>,
    /// Subscription polled for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    /// Optional message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Content
    #[serde(default)]
    pub content_blocks: Vec<ContentBlock>,
}

/// Inbox message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxMessage {
    /// Message id
    pub message_id: String,
    /// Optional message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Subscription context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_information: Option<SubscriptionInformation>,
    /// Content
    #[serde(default)]
    pub content_blocks: Vec<ContentBlock>,
}

/// Status message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    /// Message id
    pub message_id: String,
    /// Request message id
    pub in_response_to: String,
    /// Outcome
    pub status_type: StatusType,
    /// Free text detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_detail: Option<String>,
    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// TAXII 1.0 messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message_type")]
pub enum Message {
    /// Discovery request
    #[serde(rename = "Discovery_Request")]
    DiscoveryRequest(DiscoveryRequest),
    /// Discovery response
    #[serde(rename = "Discovery_Response")]
    DiscoveryResponse(DiscoveryResponse),
    /// Feed information request
    #[serde(rename = "Feed_Information_Request")]
    FeedInformationRequest(FeedInformationRequest),
    /// Feed information response
    #[serde(rename = "Feed_Information_Response")]
    FeedInformationResponse(FeedInformationResponse),
    /// Feed subscription request
    #[serde(rename = "Subscription_Management_Request")]
    ManageFeedSubscriptionRequest(ManageFeedSubscriptionRequest),
    /// Feed subscription response
    #[serde(rename = "Subscription_Management_Response")]
    ManageFeedSubscriptionResponse(ManageFeedSubscriptionResponse),
    /// Poll request
    #[serde(rename = "Poll_Request")]
    PollRequest(PollRequest),
    /// Poll response
    #[serde(rename = "Poll_Response")]
    PollResponse(PollResponse),
    /// Inbox message
    #[serde(rename = "Inbox_Message")]
    InboxMessage(InboxMessage),
    /// Status message
    #[serde(rename = "Status_Message")]
    StatusMessage(StatusMessage),
}

impl Message {
    /// Message id
    #[must_use]
    pub fn message_id(&self) -> &str {
        match self {
            Self::DiscoveryRequest(m) => &m.message_id,
            Self::DiscoveryResponse(m) => &m.message_id,
            Self::FeedInformationRequest(m) => &m.message_id,
            Self::FeedInformationResponse(m) => &m.message_id,
            Self::ManageFeedSubscriptionRequest(m) => &m.message_id,
            Self::ManageFeedSubscriptionResponse(m) => &m.message_id,
            Self::PollRequest(m) => &m.message_id,
            Self::PollResponse(m) => &m.message_id,
            Self::InboxMessage(m) => &m.message_id,
            Self::StatusMessage(m) => &m.message_id,
        }
    }

    /// Request message id, for responses
    #[must_use]
    pub fn in_response_to(&self) -> Option<&str> {
        match self {
            Self::DiscoveryResponse(m) => Some(&m.in_response_to),
            Self::FeedInformationResponse(m) => Some(&m.in_response_to),
            Self::ManageFeedSubscriptionResponse(m) => Some(&m.in_response_to),
            Self::PollResponse(m) => Some(&m.in_response_to),
            Self::StatusMessage(m) => Some(&m.in_response_to),
            _ => None,
        }
    }

    /// Check the structural rules a schema would enforce
    pub fn validate(&self) -> Result<()> {
        require_id("message_id", self.message_id())?;
        if let Some(in_response_to) = self.in_response_to() {
            require_id("in_response_to", in_response_to)?;
        }

        match self {
            Self::StatusMessage(m) if !m.status_type.is_v10() => {
                return Err(TaxiiError::BadMessage(format!(
                    "status type {} does not exist in TAXII 1.0",
                    m.status_type
                )));
            }
            Self::FeedInformationResponse(m) => {
                for info in &m.feed_informations {
                    require("feed_name", &info.feed_name)?;
                }
            }
            Self::ManageFeedSubscriptionRequest(m) => {
                require("feed_name", &m.feed_name)?;
                match (m.action, &m.subscription_id) {
                    (Action::Subscribe, Some(_)) => {
                        return Err(TaxiiError::BadMessage(
                            "subscription_id must be absent for SUBSCRIBE".into(),
                        ));
                    }
                    (Action::Unsubscribe, None) => {
                        return Err(TaxiiError::BadMessage(
                            "subscription_id is required for UNSUBSCRIBE".into(),
                        ));
                    }
                    _ => {}
                }
                if m.action == Action::Subscribe && m.delivery_parameters.is_none() {
                    return Err(TaxiiError::BadMessage(
                        "delivery_parameters are required for SUBSCRIBE".into(),
                    ));
                }
            }
            Self::PollRequest(m) => {
                require("feed_name", &m.feed_name)?;
                if let (Some(begin), Some(end)) = (
                    m.exclusive_begin_timestamp_label,
                    m.inclusive_end_timestamp_label,
                ) {
                    if begin >= end {
                        return Err(TaxiiError::BadMessage(
                            "exclusive_begin_timestamp_label must precede inclusive_end_timestamp_label"
                                .into(),
                        ));
                    }
                }
                for binding in &m.content_bindings {
                    require("content_binding", binding)?;
                }
            }
            Self::PollResponse(m) => {
                require("feed_name", &m.feed_name)?;
                for block in &m.content_blocks {
                    require("content_binding", &block.content_binding)?;
                }
            }
            Self::InboxMessage(m) => {
                if let Some(info) = &m.subscription_information {
                    require("feed_name", &info.feed_name)?;
                    require("subscription_id", &info.subscription_id)?;
                }
                for block in &m.content_blocks {
                    require("content_binding", &block.content_binding)?;
                }
            }
            _ => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_information_request_tag() {
        let msg = Message::FeedInformationRequest(FeedInformationRequest {
            message_id: "42".into(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["message_type"], "Feed_Information_Request");
    }

    #[test]
    fn test_v11_status_is_rejected() {
        let msg = Message::StatusMessage(StatusMessage {
            message_id: "1".into(),
            in_response_to: "0".into(),
            status_type: StatusType::DestinationCollectionError,
            status_detail: None,
            message: None,
        });
        assert!(msg.validate().is_err());
    }

    #[test]
    fn test_subscribe_requires_delivery_parameters() {
        let msg = Message::ManageFeedSubscriptionRequest(ManageFeedSubscriptionRequest {
            message_id: "1".into(),
            feed_name: "feed".into(),
            action: Action::Subscribe,
            subscription_id: None,
            delivery_parameters: None,
        });
        assert!(msg.validate().is_err());
    }
}

//! TAXII 1.1 message set ("collection" semantics).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{CollectionType, ResponseType, SubscriptionStatus};
use crate::status::{StatusDetail, StatusType};
use crate::{Result, TaxiiError};

use super::{require, require_id};

/// TAXII 1.1 service types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    /// Discovery service
    Discovery,
    /// Collection management service
    CollectionManagement,
    /// Poll service
    Poll,
    /// Inbox service
    Inbox,
}

/// Subscription management actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Create
    Subscribe,
    /// End
    Unsubscribe,
    /// Suspend
    Pause,
    /// Resume
    Resume,
    /// Report
    Status,
}

/// Content binding with optional subtypes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBinding {
    /// Binding id
    pub binding_id: String,
    /// Subtype ids
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtype_ids: Vec<String>,
}

/// Content block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Payload format
    pub content_binding: ContentBinding,
    /// Raw payload
    pub content: String,
    /// Timestamp label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_label: Option<DateTime<Utc>>,
    /// Optional message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Record count with partial flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCount {
    /// Number of records
    pub record_count: u64,
    /// True if the count is a lower bound
    #[serde(default)]
    pub partial_count: bool,
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
    pub inbox_service_accepted_content: Vec<ContentBinding>,
    /// Availability
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Poll endpoint of a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingServiceInstance {
    /// Protocol binding
    pub poll_protocol: String,
    /// Address
    pub poll_address: String,
    /// Message bindings
    pub poll_message_bindings: Vec<String>,
}

/// Subscription endpoint of a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionMethod {
    /// Protocol binding
    pub subscription_protocol: String,
    /// Address
    pub subscription_address: String,
    /// Message bindings
    pub subscription_message_bindings: Vec<String>,
}

/// Inbox endpoint of a collection
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
    pub supported_contents: Vec<ContentBinding>,
}

/// Collection description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInformation {
    /// Name
    pub collection_name: String,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_description: Option<String>,
    /// Supported content, empty means any
    #[serde(default)]
    pub supported_contents: Vec<ContentBinding>,
    /// Availability
    pub available: bool,
    /// Number of blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_volume: Option<u64>,
    /// Feed or set
    pub collection_type: CollectionType,
    /// Poll endpoints
    #[serde(default)]
    pub polling_service_instances: Vec<PollingServiceInstance>,
    /// Subscription endpoints
    #[serde(default)]
    pub subscription_methods: Vec<SubscriptionMethod>,
    /// Inbox endpoints
    #[serde(default)]
    pub receiving_inbox_services: Vec<ReceivingInboxService>,
}

/// Subscription delivery preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionParameters {
    /// Full content or counts
    #[serde(default)]
    pub response_type: ResponseType,
    /// Requested bindings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_bindings: Vec<ContentBinding>,
}

/// Push target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushParameters {
    /// Protocol binding of the target inbox
    pub inbox_protocol: String,
    /// Address of the target inbox
    pub inbox_address: String,
    /// Message binding to deliver with
    pub delivery_message_binding: String,
}

/// Poll endpoint of a subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollInstance {
    /// Protocol binding
    pub poll_protocol: String,
    /// Address
    pub poll_address: String,
    /// Message bindings
    pub poll_message_bindings: Vec<String>,
}

/// Subscription state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionInstance {
    /// Subscription id
    pub subscription_id: String,
    /// Lifecycle state
    pub status: SubscriptionStatus,
    /// Delivery preferences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_parameters: Option<SubscriptionParameters>,
    /// Push target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_parameters: Option<PushParameters>,
    /// Poll endpoints
    #[serde(default)]
    pub poll_instances: Vec<PollInstance>,
}

/// Poll filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollParameters {
    /// Whether asynchronous polling is allowed
    #[serde(default)]
    pub allow_asynch: bool,
    /// Full content or counts
    #[serde(default)]
    pub response_type: ResponseType,
    /// Requested bindings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_bindings: Vec<ContentBinding>,
}

/// Subscription context of pushed content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionInformation {
    /// Source collection
    pub collection_name: String,
    /// Subscription id
    pub subscription_id: String,
    /// Window start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_begin_timestamp_label: Option<DateTime<Utc>>,
    /// Window end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusive_end_timestamp_label: Option<DateTime<Utc>>,
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

/// Collection information request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInformationRequest {
    /// Message id
    pub message_id: String,
}

/// Collection information response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInformationResponse {
    /// Message id
    pub message_id: String,
    /// Request message id
    pub in_response_to: String,
    /// Collections
    #[serde(default)]
    pub collection_informations: Vec<CollectionInformation>,
}

/// Subscription management request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManageCollectionSubscriptionRequest {
    /// Message id
    pub message_id: String,
    /// Collection name
    pub collection_name: String,
    /// Requested action
    pub action: Action,
    /// Target subscription
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    /// Delivery preferences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_parameters: Option<SubscriptionParameters>,
    /// Push target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_parameters: Option<PushParameters>,
}

/// Subscription management response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManageCollectionSubscriptionResponse {
    /// Message id
    pub message_id: String,
    /// Request message id
    pub in_response_to: String,
    /// Collection name
    pub collection_name: String,
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
    /// Collection name
    pub collection_name: String,
    /// Window start (exclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_begin_timestamp_label: Option<DateTime<Utc>>,
    /// Window end (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusive_end_timestamp_label: Option<DateTime<Utc>>,
    /// Poll for this subscription
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    /// Explicit filters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_parameters: Option<PollParameters>,
}

/// Poll response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResponse {
    /// Message id
    pub message_id: String,
    /// Request message id
    pub in_response_to: String,
    /// Collection name
    pub collection_name: String,
    /// Window start (exclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_begin_timestamp_label: Option<DateTime<Utc>>,
    /// Window end (inclusive)
    pub inclusive_end_timestamp_label: DateTime<Utc>,
    /// Subscription polled for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    /// Optional message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Number of matching records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_count: Option<RecordCount>,
    /// More result parts exist
    #[serde(default)]
    pub more: bool,
    /// Result set id for multi-part results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_id: Option<String>,
    /// Part number within the result set
    #[serde(default = "default_part_number")]
    pub result_part_number: u32,
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
    /// Result set this content belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_id: Option<String>,
    /// Named destinations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destination_collection_names: Vec<String>,
    /// Subscription context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_information: Option<SubscriptionInformation>,
    /// Record count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_count: Option<RecordCount>,
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
    /// Structured details
    #[serde(default, skip_serializing_if = "StatusDetail::is_empty")]
    pub status_detail: StatusDetail,
    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// TAXII 1.1 messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message_type")]
pub enum Message {
    /// Discovery request
    #[serde(rename = "Discovery_Request")]
    DiscoveryRequest(DiscoveryRequest),
    /// Discovery response
    #[serde(rename = "Discovery_Response")]
    DiscoveryResponse(DiscoveryResponse),
    /// Collection information request
    #[serde(rename = "Collection_Information_Request")]
    CollectionInformationRequest(CollectionInformationRequest),
    /// Collection information response
    #[serde(rename = "Collection_Information_Response")]
    CollectionInformationResponse(CollectionInformationResponse),
    /// Subscription management request
    #[serde(rename = "Subscription_Management_Request")]
    ManageCollectionSubscriptionRequest(ManageCollectionSubscriptionRequest),
    /// Subscription management response
    #[serde(rename = "Subscription_Management_Response")]
    ManageCollectionSubscriptionResponse(ManageCollectionSubscriptionResponse),
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
            Self::CollectionInformationRequest(m) => &m.message_id,
            Self::CollectionInformationResponse(m) => &m.message_id,
            Self::ManageCollectionSubscriptionRequest(m) => &m.message_id,
            Self::ManageCollectionSubscriptionResponse(m) => &m.message_id,
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
            Self::CollectionInformationResponse(m) => Some(&m.in_response_to),
            Self::ManageCollectionSubscriptionResponse(m) => Some(&m.in_response_to),
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
            Self::CollectionInformationResponse(m) => {
                for info in &m.collection_informations {
                    require("collection_name", &info.collection_name)?;
                    validate_bindings(&info.supported_contents)?;
                }
            }
            Self::ManageCollectionSubscriptionRequest(m) => {
                require("collection_name", &m.collection_name)?;
                match (m.action, &m.subscription_id) {
                    (Action::Subscribe, Some(_)) => {
                        return Err(TaxiiError::BadMessage(
                            "subscription_id must be absent for SUBSCRIBE".into(),
                        ));
                    }
                    (Action::Unsubscribe | Action::Pause | Action::Resume, None) => {
                        return Err(TaxiiError::BadMessage(format!(
                            "subscription_id is required for {:?}",
                            m.action
                        )));
                    }
                    _ => {}
                }
                if let Some(params) = &m.subscription_parameters {
                    validate_bindings(&params.content_bindings)?;
                }
            }
            Self::PollRequest(m) => {
                require("collection_name", &m.collection_name)?;
                match (&m.subscription_id, &m.poll_parameters) {
                    (Some(_), Some(_)) => {
                        return Err(TaxiiError::BadMessage(
                            "subscription_id and poll_parameters are mutually exclusive".into(),
                        ));
                    }
                    (None, None) => {
                        return Err(TaxiiError::BadMessage(
                            "either subscription_id or poll_parameters is required".into(),
                        ));
                    }
                    _ => {}
                }
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
                if let Some(params) = &m.poll_parameters {
                    validate_bindings(&params.content_bindings)?;
                }
            }
            Self::PollResponse(m) => {
                require("collection_name", &m.collection_name)?;
                validate_blocks(&m.content_blocks)?;
            }
            Self::InboxMessage(m) => {
                for name in &m.destination_collection_names {
                    require("destination_collection_name", name)?;
                }
                if let Some(info) = &m.subscription_information {
                    require("collection_name", &info.collection_name)?;
                    require("subscription_id", &info.subscription_id)?;
                }
                if let Some(count) = m.record_count {
                    if !count.partial_count && count.record_count < m.content_blocks.len() as u64 {
                        return Err(TaxiiError::BadMessage(format!(
                            "record_count {} is lower than the {} content blocks carried",
                            count.record_count,
                            m.content_blocks.len()
                        )));
                    }
                }
                validate_blocks(&m.content_blocks)?;
            }
            _ => {}
        }

        Ok(())
    }
}

fn validate_bindings(bindings: &[ContentBinding]) -> Result<()> {
    for binding in bindings {
        require("binding_id", &binding.binding_id)?;
    }
    Ok(())
}

fn validate_blocks(blocks: &[ContentBlock]) -> Result<()> {
    for block in blocks {
        require("content_binding", &block.content_binding.binding_id)?;
    }
    Ok(())
}

const fn default_part_number() -> u32 {
    1
}

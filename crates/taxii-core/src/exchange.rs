//! Version-neutral request and response model.
//!
//! Services consume [`Request`] and produce [`Response`]; the transform
//! layer is the only place that maps these to TAXII 1.0 or 1.1 messages.

use chrono::{DateTime, Utc};

use crate::entities::{
    CollectionType, ContentBindingEntity, ContentBlockEntity, PushParameters, ResponseType,
    ServiceType, SubscriptionParameters, SubscriptionStatus,
};
use crate::status::{StatusDetail, StatusType};

/// A decoded request
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Message id chosen by the client
    pub message_id: String,
    /// What is being asked
    pub body: RequestBody,
}

/// Request payloads
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// List the advertised services
    Discovery,
    /// Describe the collections (feeds) of a collection-management service
    CollectionInformation,
    /// Create, change or inspect a subscription
    ManageSubscription(ManageSubscriptionRequest),
    /// Fetch content out of a collection
    Poll(PollRequest),
    /// Push content into collections
    Inbox(InboxRequest),
}

impl RequestBody {
    /// Short name used in logs and faults
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Discovery => "discovery request",
            Self::CollectionInformation => "collection information request",
            Self::ManageSubscription(_) => "subscription management request",
            Self::Poll(_) => "poll request",
            Self::Inbox(_) => "inbox message",
        }
    }
}

/// Subscription management actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionAction {
    /// Create a subscription
    Subscribe,
    /// End a subscription
    Unsubscribe,
    /// Suspend an active subscription (1.1 only)
    Pause,
    /// Resume a paused subscription (1.1 only)
    Resume,
    /// Report subscription state
    Status,
}

/// Subscription management request
#[derive(Debug, Clone, PartialEq)]
pub struct ManageSubscriptionRequest {
    /// Collection (feed) name
    pub collection_name: String,
    /// Requested action
    pub action: SubscriptionAction,
    /// Target subscription, absent for SUBSCRIBE
    pub subscription_id: Option<String>,
    /// Delivery preferences for SUBSCRIBE
    pub parameters: Option<SubscriptionParameters>,
    /// Push target for SUBSCRIBE
    pub push_parameters: Option<PushParameters>,
}

/// Poll filter parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollParameters {
    /// Full content or counts
    pub response_type: ResponseType,
    /// Bindings the client wants, empty means any
    pub content_bindings: Vec<ContentBindingEntity>,
}

/// Poll request
#[derive(Debug, Clone, PartialEq)]
pub struct PollRequest {
    /// Collection (feed) name
    pub collection_name: String,
    /// Only blocks strictly newer than this
    pub exclusive_begin: Option<DateTime<Utc>>,
    /// Only blocks not newer than this
    pub inclusive_end: Option<DateTime<Utc>>,
    /// Poll on behalf of this subscription
    pub subscription_id: Option<String>,
    /// Explicit filters when not polling for a subscription
    pub parameters: Option<PollParameters>,
}

/// Inbox message
#[derive(Debug, Clone, PartialEq)]
pub struct InboxRequest {
    /// Named destinations (1.1), empty means default routing
    pub destination_collection_names: Vec<String>,
    /// Subscription the content is delivered for
    pub subscription_id: Option<String>,
    /// Pushed blocks
    pub content_blocks: Vec<ContentBlockEntity>,
}

/// A response built by a service
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Discovery answer
    Discovery(DiscoveryResponse),
    /// Collection (feed) information answer
    CollectionInformation(CollectionInformationResponse),
    /// Subscription management answer
    ManageSubscription(ManageSubscriptionResponse),
    /// Poll answer
    Poll(PollResponse),
    /// Status message (success or fault)
    Status(StatusResponse),
}

/// One (service, protocol binding) pair a client can talk to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInstance {
    /// Protocol binding
    pub protocol_binding: String,
    /// Absolute address
    pub address: String,
    /// Message bindings
    pub message_bindings: Vec<String>,
}

/// Inbox endpoint that feeds a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivingInbox {
    /// Where to push
    pub endpoint: EndpointInstance,
    /// Content the inbox accepts, empty means any
    pub supported_content: Vec<ContentBindingEntity>,
}

/// Entry of a discovery response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    /// Service kind
    pub service_type: ServiceType,
    /// Endpoint details
    pub endpoint: EndpointInstance,
    /// Content accepted by inbox services
    pub inbox_accepted_content: Vec<ContentBindingEntity>,
    /// Whether the service is available
    pub available: bool,
    /// Description
    pub message: Option<String>,
}

/// Discovery response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryResponse {
    /// Advertised instances
    pub service_instances: Vec<ServiceInstance>,
}

/// Description of one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInformation {
    /// Collection name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Stored collection type
    pub collection_type: CollectionType,
    /// Unavailable collections are listed but advisory only
    pub available: bool,
    /// Supported content, empty means any
    pub supported_content: Vec<ContentBindingEntity>,
    /// Number of stored blocks
    pub volume: u64,
    /// Inbox instances pushing into the collection
    pub receiving_inbox_services: Vec<ReceivingInbox>,
    /// Poll instances serving the collection
    pub polling_service_instances: Vec<EndpointInstance>,
    /// Collection-management instances accepting subscriptions
    pub subscription_methods: Vec<EndpointInstance>,
}

/// Collection information response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionInformationResponse {
    /// One entry per exposed collection
    pub collections: Vec<CollectionInformation>,
}

/// Subscription state returned to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInstance {
    /// Subscription id
    pub subscription_id: String,
    /// Lifecycle state
    pub status: SubscriptionStatus,
    /// Delivery preferences
    pub parameters: Option<SubscriptionParameters>,
    /// Push target
    pub push_parameters: Option<PushParameters>,
    /// Where the subscription can be polled
    pub poll_instances: Vec<EndpointInstance>,
}

/// Subscription management response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManageSubscriptionResponse {
    /// Collection (feed) name
    pub collection_name: String,
    /// Optional message
    pub message: Option<String>,
    /// Affected subscriptions
    pub subscriptions: Vec<SubscriptionInstance>,
}

/// Poll response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResponse {
    /// Collection (feed) name
    pub collection_name: String,
    /// Echo of the requested window start
    pub exclusive_begin: Option<DateTime<Utc>>,
    /// Window end actually used
    pub inclusive_end: DateTime<Utc>,
    /// Subscription polled for
    pub subscription_id: Option<String>,
    /// Number of matching blocks
    pub record_count: u64,
    /// Matching blocks, oldest first (empty for count-only polls)
    pub content_blocks: Vec<ContentBlockEntity>,
    /// Optional message
    pub message: Option<String>,
}

/// Status message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    /// Outcome
    pub status_type: StatusType,
    /// Human-readable message
    pub message: Option<String>,
    /// Structured details
    pub detail: StatusDetail,
}

impl StatusResponse {
    /// Successful status with an optional message
    #[must_use]
    pub fn success(message: Option<String>) -> Self {
        Self {
            status_type: StatusType::Success,
            message,
            detail: StatusDetail::new(),
        }
    }

    /// Build a fault status from a protocol error
    #[must_use]
    pub fn from_error(err: &crate::TaxiiError) -> Self {
        Self {
            status_type: err.status_type(),
            message: Some(err.to_string()),
            detail: err.status_detail(),
        }
    }
}

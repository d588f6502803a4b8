//! Version-neutral domain objects.
//!
//! Nothing in here knows about TAXII 1.0 versus 1.1; the transform layer
//! projects these into the matching wire message set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CollectionType {
    /// Ordered, append-only stream of content (the only kind TAXII 1.0 knows)
    #[default]
    #[serde(rename = "DATA_FEED")]
    Feed,
    /// Unordered set of content
    #[serde(rename = "DATA_SET")]
    Set,
}

impl std::fmt::Display for CollectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Feed => write!(f, "DATA_FEED"),
            Self::Set => write!(f, "DATA_SET"),
        }
    }
}

/// Content binding: payload format identifier plus optional subtypes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentBindingEntity {
    /// Binding identifier (e.g. `urn:stix.mitre.org:xml:1.1.1`)
    pub binding: String,

    /// Ordered subtype identifiers, empty means "any subtype"
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtypes: Vec<String>,
}

impl ContentBindingEntity {
    /// Create a binding without subtypes
    pub fn new(binding: impl Into<String>) -> Self {
        Self {
            binding: binding.into(),
            subtypes: Vec::new(),
        }
    }

    /// Attach subtypes to the binding
    #[must_use]
    pub fn with_subtypes<I, S>(mut self, subtypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subtypes = subtypes.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if the two bindings are compatible.
    ///
    /// Binding ids must be equal. A side without subtypes matches any
    /// subtype of the other, otherwise at least one subtype must be shared.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        if self.binding != other.binding {
            return false;
        }
        if self.subtypes.is_empty() || other.subtypes.is_empty() {
            return true;
        }
        self.subtypes.iter().any(|s| other.subtypes.contains(s))
    }

    /// Returns true if any binding in `supported` matches this one
    #[must_use]
    pub fn is_supported_by(&self, supported: &[Self]) -> bool {
        supported.iter().any(|s| s.matches(self))
    }
}

impl std::fmt::Display for ContentBindingEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.subtypes.is_empty() {
            write!(f, "{}", self.binding)
        } else {
            write!(f, "{} ({})", self.binding, self.subtypes.join(", "))
        }
    }
}

/// Named grouping of content blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntity {
    /// Storage id, assigned by the repository
    #[serde(default)]
    pub id: Option<u64>,

    /// Unique collection name
    pub name: String,

    /// Free text description
    #[serde(default)]
    pub description: Option<String>,

    /// Feed or set
    #[serde(default, rename = "type")]
    pub collection_type: CollectionType,

    /// Unavailable collections are still listed but not served
    #[serde(default = "default_true")]
    pub available: bool,

    /// Accept content of any binding regardless of `supported_content`
    #[serde(default)]
    pub accept_all_content: bool,

    /// Supported content bindings, empty means any
    #[serde(default)]
    pub supported_content: Vec<ContentBindingEntity>,
}

impl CollectionEntity {
    /// Create an available feed collection that accepts any content
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            collection_type: CollectionType::Feed,
            available: true,
            accept_all_content: false,
            supported_content: Vec::new(),
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the collection type
    #[must_use]
    pub const fn with_type(mut self, collection_type: CollectionType) -> Self {
        self.collection_type = collection_type;
        self
    }

    /// Set availability
    #[must_use]
    pub const fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Set the accept-all flag
    #[must_use]
    pub const fn with_accept_all_content(mut self, accept_all: bool) -> Self {
        self.accept_all_content = accept_all;
        self
    }

    /// Set the supported content bindings
    #[must_use]
    pub fn with_supported_content(mut self, bindings: Vec<ContentBindingEntity>) -> Self {
        self.supported_content = bindings;
        self
    }

    /// Returns true if a block with this binding may be persisted here
    #[must_use]
    pub fn accepts(&self, binding: &ContentBindingEntity) -> bool {
        self.accept_all_content
            || self.supported_content.is_empty()
            || binding.is_supported_by(&self.supported_content)
    }

    /// Supported content as advertised to clients (empty when any is accepted)
    #[must_use]
    pub fn advertised_content(&self) -> &[ContentBindingEntity] {
        if self.accept_all_content {
            &[]
        } else {
            &self.supported_content
        }
    }
}

/// One unit of shared intelligence, immutable once stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlockEntity {
    /// Storage id, assigned by the repository
    #[serde(default)]
    pub id: Option<u64>,

    /// Raw payload
    pub content: String,

    /// Creation instant, used for poll windows
    pub timestamp_label: DateTime<Utc>,

    /// Optional comment attached by the producer
    #[serde(default)]
    pub message: Option<String>,

    /// Payload format
    pub content_binding: ContentBindingEntity,

    /// Id of the inbox message that delivered the block
    #[serde(default)]
    pub inbox_message_id: Option<String>,
}

impl ContentBlockEntity {
    /// Create a block stamped with the current time
    pub fn new(content: impl Into<String>, content_binding: ContentBindingEntity) -> Self {
        Self {
            id: None,
            content: content.into(),
            timestamp_label: Utc::now(),
            message: None,
            content_binding,
            inbox_message_id: None,
        }
    }

    /// Override the timestamp label
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp_label = timestamp;
        self
    }

    /// Attach a message
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Kind of a TAXII service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    /// Lists the other services
    Discovery,
    /// Reports collections and manages subscriptions
    CollectionManagement,
    /// Serves content blocks out of collections
    Poll,
    /// Accepts pushed content blocks
    Inbox,
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discovery => write!(f, "discovery"),
            Self::CollectionManagement => write!(f, "collection_management"),
            Self::Poll => write!(f, "poll"),
            Self::Inbox => write!(f, "inbox"),
        }
    }
}

/// A configured service instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntity {
    /// Stable service id
    pub id: String,

    /// Service kind
    pub service_type: ServiceType,

    /// Service path, relative to the server domain
    pub address: String,

    /// Free text description
    #[serde(default)]
    pub description: Option<String>,

    /// Protocol bindings in configuration order
    pub protocol_bindings: Vec<String>,

    /// Message bindings in configuration order
    pub message_bindings: Vec<String>,

    /// Whether the service currently accepts requests
    #[serde(default = "default_true")]
    pub available: bool,
}

impl ServiceEntity {
    /// Returns true if the service is offered over this protocol binding
    #[must_use]
    pub fn supports_protocol(&self, protocol_binding: &str) -> bool {
        self.protocol_bindings.iter().any(|p| p == protocol_binding)
    }

    /// Returns true if the service speaks this message binding
    #[must_use]
    pub fn supports_message_binding(&self, message_binding: &str) -> bool {
        self.message_bindings.iter().any(|m| m == message_binding)
    }
}

/// Subscription lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    /// Receiving content
    Active,
    /// Temporarily suspended
    Paused,
    /// Terminated
    Unsubscribed,
}

/// What a poll or subscription delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseType {
    /// Content blocks
    #[default]
    Full,
    /// Only the number of matching blocks
    CountOnly,
}

/// Delivery preferences of a subscription
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionParameters {
    /// Full content or counts
    #[serde(default)]
    pub response_type: ResponseType,

    /// Bindings the subscriber wants, empty means any
    #[serde(default)]
    pub content_bindings: Vec<ContentBindingEntity>,
}

/// Where pushed content would be delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushParameters {
    /// Protocol binding of the receiving inbox
    pub protocol_binding: String,

    /// Address of the receiving inbox
    pub address: String,

    /// Message binding to deliver with
    pub message_binding: String,
}

/// A client's subscription to a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionEntity {
    /// Subscription id handed to the client
    pub subscription_id: String,

    /// Collection the subscription belongs to
    pub collection_id: u64,

    /// Lifecycle state
    pub status: SubscriptionStatus,

    /// Delivery preferences
    #[serde(default)]
    pub params: Option<SubscriptionParameters>,

    /// Push target
    #[serde(default)]
    pub push_parameters: Option<PushParameters>,

    /// When the subscription was created
    pub created: DateTime<Utc>,
}

impl SubscriptionEntity {
    /// Returns true if the subscription currently receives content
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }
}

const fn default_true() -> bool {
    true
}

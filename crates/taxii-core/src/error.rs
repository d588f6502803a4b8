use thiserror::Error;

use crate::status::{
    StatusDetail, StatusType, SD_ACCEPTABLE_DESTINATION, SD_ITEM, SD_SUPPORTED_CONTENT,
    SD_SUPPORTED_PROTOCOL,
};

/// Result type alias for TAXII protocol operations
pub type Result<T> = std::result::Result<T, TaxiiError>;

/// Protocol-level errors raised while decoding or processing TAXII messages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaxiiError {
    /// Wire payload could not be decoded or failed validation
    #[error("bad message: {0}")]
    BadMessage(String),

    /// Message binding identifier is outside the supported set
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(String),

    /// Referenced collection, service or subscription is absent or not exposed
    #[error("not found: {resource}")]
    NotFound {
        /// Name or id of the missing item
        resource: String,
    },

    /// Content binding incompatible with the destination collection
    #[error("content binding {binding} is not supported by collection {collection}")]
    ContentBindingMismatch {
        /// Collection that rejected the block
        collection: String,
        /// Binding id of the rejected block
        binding: String,
        /// Bindings the collection accepts
        supported: Vec<String>,
    },

    /// Message kind is not handled by the receiving service
    #[error("unsupported message: {0}")]
    UnsupportedMessage(String),

    /// Protocol binding not offered by the receiving service
    #[error("unsupported protocol binding: {binding}")]
    UnsupportedProtocol {
        /// Binding the request arrived with, or a note that it was missing
        binding: String,
        /// Bindings the service offers
        supported: Vec<String>,
    },

    /// Destination collection names missing, unknown or rejected
    #[error("destination collection error: {message}")]
    DestinationCollection {
        /// Human-readable explanation
        message: String,
        /// Collections the inbox would have accepted
        acceptable: Vec<String>,
    },

    /// Request was understood but could not be fulfilled
    #[error("{0}")]
    Failure(String),
}

impl TaxiiError {
    /// Shorthand for a [`TaxiiError::NotFound`].
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// TAXII status type this error is reported as
    #[must_use]
    pub const fn status_type(&self) -> StatusType {
        match self {
            Self::BadMessage(_) => StatusType::BadMessage,
            Self::UnsupportedVersion(_) | Self::UnsupportedMessage(_) => {
                StatusType::UnsupportedMessage
            }
            Self::NotFound { .. } => StatusType::NotFound,
            Self::ContentBindingMismatch { .. } => StatusType::UnsupportedContent,
            Self::UnsupportedProtocol { .. } => StatusType::UnsupportedProtocol,
            Self::DestinationCollection { .. } => StatusType::DestinationCollectionError,
            Self::Failure(_) => StatusType::Failure,
        }
    }

    /// Structured status details for the error, if any
    #[must_use]
    pub fn status_detail(&self) -> StatusDetail {
        let mut detail = StatusDetail::new();
        match self {
            Self::NotFound { resource } => {
                detail.insert(SD_ITEM.to_string(), vec![resource.clone()]);
            }
            Self::DestinationCollection { acceptable, .. } if !acceptable.is_empty() => {
                detail.insert(SD_ACCEPTABLE_DESTINATION.to_string(), acceptable.clone());
            }
            Self::UnsupportedProtocol { supported, .. } if !supported.is_empty() => {
                detail.insert(SD_SUPPORTED_PROTOCOL.to_string(), supported.clone());
            }
            Self::ContentBindingMismatch { supported, .. } if !supported.is_empty() => {
                detail.insert(SD_SUPPORTED_CONTENT.to_string(), supported.clone());
            }
            _ => {}
        }
        detail
    }
}

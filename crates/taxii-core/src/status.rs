use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// TAXII status types carried by status messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusType {
    /// Request succeeded
    Success,
    /// Message could not be parsed or failed validation
    BadMessage,
    /// Request refused
    Denied,
    /// Generic failure
    Failure,
    /// Referenced item does not exist
    NotFound,
    /// Poll service does not support polling of this collection
    PollingUnsupported,
    /// Client should retry later
    Retry,
    /// Client is not authorized
    Unauthorized,
    /// Message kind is not handled by the endpoint
    UnsupportedMessage,
    /// Content binding is not supported
    UnsupportedContent,
    /// Protocol binding is not supported
    UnsupportedProtocol,
    /// Destination collection names were missing or invalid (1.1 only)
    DestinationCollectionError,
    /// Result not ready yet (1.1 only)
    Pending,
    /// Query format not supported (1.1 only)
    UnsupportedQuery,
}

impl StatusType {
    /// Returns true if the status exists in TAXII 1.0.
    #[must_use]
    pub const fn is_v10(self) -> bool {
        !matches!(
            self,
            Self::DestinationCollectionError | Self::Pending | Self::UnsupportedQuery
        )
    }

    /// Status type to use when answering in TAXII 1.0.
    ///
    /// 1.1-only statuses degrade to `FAILURE`.
    #[must_use]
    pub const fn for_v10(self) -> Self {
        if self.is_v10() {
            self
        } else {
            Self::Failure
        }
    }
}

impl std::fmt::Display for StatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Success => "SUCCESS",
            Self::BadMessage => "BAD_MESSAGE",
            Self::Denied => "DENIED",
            Self::Failure => "FAILURE",
            Self::NotFound => "NOT_FOUND",
            Self::PollingUnsupported => "POLLING_UNSUPPORTED",
            Self::Retry => "RETRY",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::UnsupportedMessage => "UNSUPPORTED_MESSAGE",
            Self::UnsupportedContent => "UNSUPPORTED_CONTENT",
            Self::UnsupportedProtocol => "UNSUPPORTED_PROTOCOL",
            Self::DestinationCollectionError => "DESTINATION_COLLECTION_ERROR",
            Self::Pending => "PENDING",
            Self::UnsupportedQuery => "UNSUPPORTED_QUERY",
        };
        f.write_str(label)
    }
}

/// Structured status detail (detail name -> values).
pub type StatusDetail = BTreeMap<String, Vec<String>>;

/// Detail key listing destination collections the inbox accepts.
pub const SD_ACCEPTABLE_DESTINATION: &str = "ACCEPTABLE_DESTINATION";
/// Detail key naming the item that was not found.
pub const SD_ITEM: &str = "ITEM";
/// Detail key listing supported protocol bindings.
pub const SD_SUPPORTED_PROTOCOL: &str = "SUPPORTED_PROTOCOL";
/// Detail key listing supported content bindings.
pub const SD_SUPPORTED_CONTENT: &str = "SUPPORTED_CONTENT";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_as_taxii_name() {
        let json = serde_json::to_string(&StatusType::DestinationCollectionError).unwrap();
        assert_eq!(json, "\"DESTINATION_COLLECTION_ERROR\"");
        assert_eq!(
            StatusType::DestinationCollectionError.to_string(),
            "DESTINATION_COLLECTION_ERROR"
        );
    }

    #[test]
    fn test_v11_only_statuses_degrade_for_v10() {
        assert_eq!(StatusType::NotFound.for_v10(), StatusType::NotFound);
        assert_eq!(
            StatusType::DestinationCollectionError.for_v10(),
            StatusType::Failure
        );
    }
}

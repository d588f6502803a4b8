use serde::{Deserialize, Serialize};

use crate::constants::{
    VID_TAXII_SERVICES_10, VID_TAXII_SERVICES_11, VID_TAXII_XML_10, VID_TAXII_XML_11,
};

/// Supported TAXII protocol versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// TAXII 1.0 ("feed" semantics)
    #[serde(rename = "1.0")]
    V10,
    /// TAXII 1.1 ("collection" semantics)
    #[serde(rename = "1.1")]
    V11,
}

impl ProtocolVersion {
    /// Resolve a message binding identifier (exact match).
    #[must_use]
    pub fn from_message_binding(vid: &str) -> Option<Self> {
        match vid {
            VID_TAXII_XML_10 => Some(Self::V10),
            VID_TAXII_XML_11 => Some(Self::V11),
            _ => None,
        }
    }

    /// Resolve a services specification identifier (exact match).
    #[must_use]
    pub fn from_services_binding(vid: &str) -> Option<Self> {
        match vid {
            VID_TAXII_SERVICES_10 => Some(Self::V10),
            VID_TAXII_SERVICES_11 => Some(Self::V11),
            _ => None,
        }
    }

    /// Message binding identifier for this version.
    #[must_use]
    pub const fn message_binding(self) -> &'static str {
        match self {
            Self::V10 => VID_TAXII_XML_10,
            Self::V11 => VID_TAXII_XML_11,
        }
    }

    /// Services specification identifier for this version.
    #[must_use]
    pub const fn services_binding(self) -> &'static str {
        match self {
            Self::V10 => VID_TAXII_SERVICES_10,
            Self::V11 => VID_TAXII_SERVICES_11,
        }
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V10 => write!(f, "1.0"),
            Self::V11 => write!(f, "1.1"),
        }
    }
}

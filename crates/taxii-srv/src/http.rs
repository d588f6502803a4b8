//! HTTP binding helpers: header maps and TAXII response headers.

use std::collections::BTreeMap;
use taxii_core::constants::{
    HTTP_CONTENT_JSON, HTTP_CONTENT_TYPE, HTTP_X_TAXII_ACCEPT, HTTP_X_TAXII_CONTENT_TYPE,
    HTTP_X_TAXII_PROTOCOL, HTTP_X_TAXII_SERVICES, VID_TAXII_HTTPS_10, VID_TAXII_HTTP_10,
};
use taxii_core::ProtocolVersion;

/// Header map with case-insensitive lookup.
///
/// Names keep the spelling they were inserted with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<String, (String, String)>,
}

impl Headers {
    /// Empty header map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.entries
            .insert(name.to_ascii_lowercase(), (name, value.into()));
    }

    /// Value of a header, whatever its case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|(_, value)| value.as_str())
    }

    /// Iterate `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Encoded response handed back to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Response headers.
    pub headers: Headers,
    /// Response body.
    pub body: Vec<u8>,
}

/// Protocol binding id for the scheme.
#[must_use]
pub const fn protocol_binding(https: bool) -> &'static str {
    if https {
        VID_TAXII_HTTPS_10
    } else {
        VID_TAXII_HTTP_10
    }
}

/// Headers announcing a TAXII response of `version`.
#[must_use]
pub fn taxii_headers(version: ProtocolVersion, https: bool) -> Headers {
    let mut headers = Headers::new();
    headers.insert(HTTP_CONTENT_TYPE, HTTP_CONTENT_JSON);
    headers.insert(HTTP_X_TAXII_CONTENT_TYPE, version.message_binding());
    headers.insert(HTTP_X_TAXII_PROTOCOL, protocol_binding(https));
    headers.insert(HTTP_X_TAXII_SERVICES, version.services_binding());
    headers
}

/// Service path with any trailing slash removed (the root stays `/`).
#[must_use]
pub fn normalize_path(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

/// Version the client wants the response in.
///
/// `X-TAXII-Accept` wins when it names a supported binding, otherwise the
/// request version is used.
#[must_use]
pub fn response_version(headers: &Headers, request_version: ProtocolVersion) -> ProtocolVersion {
    headers
        .get(HTTP_X_TAXII_ACCEPT)
        .and_then(ProtocolVersion::from_message_binding)
        .unwrap_or(request_version)
}

//! TAXII version identifiers, header names and well-known content bindings.

/// TAXII 1.0 XML message binding.
pub const VID_TAXII_XML_10: &str = "urn:taxii.mitre.org:message:xml:1.0";
/// TAXII 1.1 XML message binding.
pub const VID_TAXII_XML_11: &str = "urn:taxii.mitre.org:message:xml:1.1";

/// TAXII 1.0 services specification.
pub const VID_TAXII_SERVICES_10: &str = "urn:taxii.mitre.org:services:1.0";
/// TAXII 1.1 services specification.
pub const VID_TAXII_SERVICES_11: &str = "urn:taxii.mitre.org:services:1.1";

/// HTTP protocol binding.
pub const VID_TAXII_HTTP_10: &str = "urn:taxii.mitre.org:protocol:http:1.0";
/// HTTPS protocol binding.
pub const VID_TAXII_HTTPS_10: &str = "urn:taxii.mitre.org:protocol:https:1.0";

/// Every message binding the server can decode.
pub const SUPPORTED_MESSAGE_BINDINGS: [&str; 2] = [VID_TAXII_XML_10, VID_TAXII_XML_11];

/// Every protocol binding the server knows about.
pub const SUPPORTED_PROTOCOL_BINDINGS: [&str; 2] = [VID_TAXII_HTTP_10, VID_TAXII_HTTPS_10];

// Header names. Lookups are case-insensitive, these are the canonical forms.

/// Message binding of the request body.
pub const HTTP_X_TAXII_CONTENT_TYPE: &str = "X-TAXII-Content-Type";
/// Protocol binding the request was sent over.
pub const HTTP_X_TAXII_PROTOCOL: &str = "X-TAXII-Protocol";
/// Services specification version.
pub const HTTP_X_TAXII_SERVICES: &str = "X-TAXII-Services";
/// Message binding the client accepts in return.
pub const HTTP_X_TAXII_ACCEPT: &str = "X-TAXII-Accept";
/// Standard content type header.
pub const HTTP_CONTENT_TYPE: &str = "Content-Type";
/// Standard accept header.
pub const HTTP_ACCEPT: &str = "Accept";

/// Media type of TAXII message bodies.
pub const HTTP_CONTENT_JSON: &str = "application/json";

// Content bindings commonly exchanged over TAXII.

/// STIX 1.0 XML.
pub const CB_STIX_XML_10: &str = "urn:stix.mitre.org:xml:1.0";
/// STIX 1.0.1 XML.
pub const CB_STIX_XML_101: &str = "urn:stix.mitre.org:xml:1.0.1";
/// STIX 1.1 XML.
pub const CB_STIX_XML_11: &str = "urn:stix.mitre.org:xml:1.1";
/// STIX 1.1.1 XML.
pub const CB_STIX_XML_111: &str = "urn:stix.mitre.org:xml:1.1.1";
/// STIX 1.2 XML.
pub const CB_STIX_XML_12: &str = "urn:stix.mitre.org:xml:1.2";
/// CAP 1.1.
pub const CB_CAP_11: &str = "urn:oasis:names:tc:emergency:cap:1.1";
/// XML encryption.
pub const CB_XENC_122002: &str = "http://www.w3.org/2001/04/xmlenc#";
/// S/MIME.
pub const CB_SMIME: &str = "application/x-pkcs7-mime";

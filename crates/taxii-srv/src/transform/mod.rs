//! Message transform: wire payloads to neutral requests and back.
//!
//! Bodies are the JSON rendition of the TAXII message sets defined in
//! `taxii_core::tm10` / `taxii_core::tm11`. The message binding header picks
//! which set a body is decoded with.

mod v10;
mod v11;

use taxii_core::{
    tm10, tm11, ProtocolVersion, Request, Response, TaxiiError, VersionedMessage,
};
use uuid::Uuid;

/// Protocol version selected by a message binding identifier.
///
/// Only the exact identifiers of the supported bindings are recognised.
pub fn message_version(content_type: &str) -> taxii_core::Result<ProtocolVersion> {
    ProtocolVersion::from_message_binding(content_type)
        .ok_or_else(|| TaxiiError::UnsupportedVersion(content_type.to_string()))
}

/// Decode a message body sent under `content_type`.
///
/// With `validate` set, the decoded message must also pass its structural
/// checks (non-empty ids, required fields, consistent parameters).
pub fn parse_message(
    content_type: &str,
    body: &[u8],
    validate: bool,
) -> taxii_core::Result<VersionedMessage> {
    let version = message_version(content_type)?;
    let decoded: Result<VersionedMessage, serde_json::Error> = match version {
        ProtocolVersion::V10 => serde_json::from_slice::<tm10::Message>(body).map(Into::into),
        ProtocolVersion::V11 => serde_json::from_slice::<tm11::Message>(body).map(Into::into),
    };
    let message = decoded.map_err(|e| {
        TaxiiError::BadMessage(format!("cannot decode TAXII {version} message: {e}"))
    })?;
    if validate {
        message.validate()?;
    }
    Ok(message)
}

/// Encode a message body.
pub fn serialize_message(message: &VersionedMessage) -> crate::Result<Vec<u8>> {
    let body = match message {
        VersionedMessage::V10(m) => serde_json::to_vec(m)?,
        VersionedMessage::V11(m) => serde_json::to_vec(m)?,
    };
    Ok(body)
}

/// Neutral request carried by a request message.
pub fn to_request(message: VersionedMessage) -> taxii_core::Result<Request> {
    match message {
        VersionedMessage::V10(m) => v10::to_request(m),
        VersionedMessage::V11(m) => v11::to_request(m),
    }
}

/// Response message of the given version answering `in_response_to`.
#[must_use]
pub fn to_message(
    version: ProtocolVersion,
    in_response_to: &str,
    response: Response,
) -> VersionedMessage {
    let message_id = generate_message_id();
    match version {
        ProtocolVersion::V10 => v10::to_message(message_id, in_response_to, response).into(),
        ProtocolVersion::V11 => v11::to_message(message_id, in_response_to, response).into(),
    }
}

/// Fresh message id for server-originated messages.
#[must_use]
pub fn generate_message_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxii_core::constants::{VID_TAXII_XML_10, VID_TAXII_XML_11};
    use taxii_core::{MessageKind, RequestBody, StatusResponse};

    #[test]
    fn test_malformed_body_is_bad_message() {
        for content_type in [VID_TAXII_XML_10, VID_TAXII_XML_11] {
            let err = parse_message(content_type, b"<not-json", true).unwrap_err();
            assert!(matches!(err, TaxiiError::BadMessage(_)), "{content_type}: {err}");
        }
    }

    #[test]
    fn test_unknown_binding_is_unsupported_version() {
        let body = br#"{"message_type": "Discovery_Request", "message_id": "1"}"#;
        let unknown = [
            "urn:taxii.mitre.org:message:xml:2.0",
            "URN:TAXII.MITRE.ORG:MESSAGE:XML:1.1",
            "",
        ];
        for content_type in unknown {
            assert!(matches!(
                parse_message(content_type, body, true),
                Err(TaxiiError::UnsupportedVersion(_))
            ));
        }
    }

    #[test]
    fn test_invalid_message_is_bad_message() {
        let body = br#"{"message_type": "Discovery_Request", "message_id": ""}"#;
        assert!(matches!(
            parse_message(VID_TAXII_XML_11, body, true),
            Err(TaxiiError::BadMessage(_))
        ));
    }

    #[test]
    fn test_validation_can_be_skipped() {
        // Decodes fine, but a poll needs a subscription or poll parameters.
        let body =
            br#"{"message_type": "Poll_Request", "message_id": "p-1", "collection_name": "c"}"#;
        assert!(matches!(
            parse_message(VID_TAXII_XML_11, body, true),
            Err(TaxiiError::BadMessage(_))
        ));

        let message = parse_message(VID_TAXII_XML_11, body, false).unwrap();
        assert_eq!(message.kind(), MessageKind::PollRequest);
        assert_eq!(message.message_id(), "p-1");
    }

    #[test]
    fn test_feed_messages_only_exist_in_10() {
        let body = br#"{"message_type": "Feed_Information_Request", "message_id": "1"}"#;
        assert!(parse_message(VID_TAXII_XML_10, body, true).is_ok());
        assert!(parse_message(VID_TAXII_XML_11, body, true).is_err());
    }

    #[test]
    fn test_parse_and_convert_discovery() {
        let body = br#"{"message_type": "Discovery_Request", "message_id": "42"}"#;
        let message = parse_message(VID_TAXII_XML_11, body, true).unwrap();
        assert_eq!(message.kind(), MessageKind::DiscoveryRequest);

        let request = to_request(message).unwrap();
        assert_eq!(request.message_id, "42");
        assert_eq!(request.body, RequestBody::Discovery);
    }

    #[test]
    fn test_response_is_in_requested_version() {
        for version in [ProtocolVersion::V10, ProtocolVersion::V11] {
            let message = to_message(
                version,
                "42",
                Response::Status(StatusResponse::success(None)),
            );
            assert_eq!(message.version(), version);
            assert_eq!(message.in_response_to(), Some("42"));
            assert_eq!(message.kind(), MessageKind::StatusMessage);
            assert_ne!(message.message_id(), "42");

            let body = serialize_message(&message).unwrap();
            let decoded = parse_message(version.message_binding(), &body, true).unwrap();
            assert_eq!(decoded, message);
        }
    }
}

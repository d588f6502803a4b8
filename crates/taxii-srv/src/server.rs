//! TAXII server: service registry and request routing.
//!
//! The transport hands over `(path, headers, body)` and gets back a
//! [`RawResponse`]. Everything between header validation and encoding the
//! reply happens here.

use std::path::PathBuf;
use std::sync::Arc;
use taxii_core::constants::{
    HTTP_X_TAXII_ACCEPT, HTTP_X_TAXII_CONTENT_TYPE, HTTP_X_TAXII_PROTOCOL, HTTP_X_TAXII_SERVICES,
    VID_TAXII_HTTPS_10,
};
use taxii_core::{
    ProtocolVersion, Response, ServiceEntity, ServiceType, StatusResponse, TaxiiError,
    VersionedMessage,
};
use tracing::{debug, info, warn};

use crate::config::{ServerConfig, ServiceConfig};
use crate::data::{DataManager, MemoryRepository, Repository};
use crate::http::{normalize_path, response_version, taxii_headers, Headers, RawResponse};
use crate::services::{
    CollectionManagementService, Deployment, DiscoveryService, InboxService, PollService,
    TaxiiService,
};
use crate::{transform, Result};

/// Message id answered to when the request id is unknown.
const UNKNOWN_MESSAGE_ID: &str = "0";

/// A configured TAXII server.
pub struct TaxiiServer {
    manager: DataManager,
    services: Vec<Arc<dyn TaxiiService>>,
    snapshot: Option<(Arc<MemoryRepository>, PathBuf)>,
}

impl std::fmt::Debug for TaxiiServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self
            .services
            .iter()
            .map(|s| s.definition().id.as_str())
            .collect();
        f.debug_struct("TaxiiServer")
            .field("services", &ids)
            .finish_non_exhaustive()
    }
}

impl TaxiiServer {
    /// Server over already built services.
    #[must_use]
    pub fn new(manager: DataManager, services: Vec<Arc<dyn TaxiiService>>) -> Self {
        Self {
            manager,
            services,
            snapshot: None,
        }
    }

    /// Build the configured services over `repository` and provision collections.
    pub async fn from_config(config: &ServerConfig, repository: Arc<dyn Repository>) -> Result<Self> {
        config.validate()?;

        let manager = DataManager::new(config.service_entities(), repository);
        manager.provision(&config.collections).await?;

        let deployment = Arc::new(
            config
                .services
                .iter()
                .filter(|s| s.service_type == ServiceType::Inbox)
                .fold(Deployment::new(&config.domain), |deployment, s| {
                    deployment.with_inbox_content(
                        &s.id,
                        s.inbox_settings().advertised_content().to_vec(),
                    )
                }),
        );

        let services: Vec<Arc<dyn TaxiiService>> = config
            .services
            .iter()
            .map(|s| build_service(s, config, &deployment, &manager))
            .collect();

        info!(
            domain = %config.domain,
            services = services.len(),
            collections = config.collections.len(),
            "TAXII server configured"
        );

        Ok(Self::new(manager, services))
    }

    /// Build the server over the in-memory repository, restoring
    /// `state_path` when configured.
    pub async fn open(config: &ServerConfig) -> Result<Self> {
        let (repository, snapshot) = match &config.state_path {
            Some(path) => {
                let repository = Arc::new(MemoryRepository::open(path)?);
                (repository.clone(), Some((repository, path.clone())))
            }
            None => (Arc::new(MemoryRepository::new()), None),
        };

        let mut server = Self::from_config(config, repository).await?;
        server.snapshot = snapshot;
        Ok(server)
    }

    /// Write the repository snapshot, if one is configured.
    pub async fn persist(&self) -> Result<()> {
        if let Some((repository, path)) = &self.snapshot {
            repository.save(path).await?;
            debug!(path = %path.display(), "repository snapshot written");
        }
        Ok(())
    }

    /// Data manager shared by the services.
    #[must_use]
    pub const fn manager(&self) -> &DataManager {
        &self.manager
    }

    /// Services in configuration order.
    #[must_use]
    pub fn services(&self) -> &[Arc<dyn TaxiiService>] {
        &self.services
    }

    /// Service by id.
    #[must_use]
    pub fn get_service(&self, service_id: &str) -> Option<&Arc<dyn TaxiiService>> {
        self.services
            .iter()
            .find(|s| s.definition().id == service_id)
    }

    /// Service served under `path`; a trailing slash is ignored.
    #[must_use]
    pub fn get_service_by_path(&self, path: &str) -> Option<&Arc<dyn TaxiiService>> {
        let wanted = normalize_path(path);
        self.services
            .iter()
            .find(|s| normalize_path(&s.definition().address) == wanted)
    }

    /// Handle one HTTP request.
    ///
    /// Protocol errors are answered with a status message. Requests whose
    /// message binding cannot be served get [`TaxiiError::UnsupportedVersion`]
    /// back, since there is no version to answer in.
    pub async fn handle(&self, path: &str, headers: &Headers, body: &[u8]) -> Result<RawResponse> {
        let content_type = headers.get(HTTP_X_TAXII_CONTENT_TYPE).ok_or_else(|| {
            TaxiiError::UnsupportedVersion(format!("missing {HTTP_X_TAXII_CONTENT_TYPE} header"))
        })?;
        let version = transform::message_version(content_type)?;
        if let Some(accept) = headers.get(HTTP_X_TAXII_ACCEPT) {
            transform::message_version(accept)?;
        }

        let service = self.get_service_by_path(path);
        if let Some(service) = service {
            if !service.definition().supports_message_binding(content_type) {
                return Err(TaxiiError::UnsupportedVersion(format!(
                    "{content_type} is not served by {path}"
                ))
                .into());
            }
        }

        let reply_version = response_version(headers, version);
        let https = headers.get(HTTP_X_TAXII_PROTOCOL) == Some(VID_TAXII_HTTPS_10);

        let reply = match check_request(service, path, content_type, headers, body) {
            Ok((service, message)) => {
                debug!(
                    service = %service.definition().id,
                    message_id = %message.message_id(),
                    kind = ?message.kind(),
                    "request accepted"
                );
                service.process(headers, message).await
            }
            Err((in_response_to, err)) => {
                warn!(path = %path, error = %err, "request refused");
                transform::to_message(
                    reply_version,
                    &in_response_to,
                    Response::Status(StatusResponse::from_error(&err)),
                )
            }
        };

        Ok(RawResponse {
            headers: taxii_headers(reply_version, https),
            body: transform::serialize_message(&reply)?,
        })
    }
}

/// Validate what only the server can check, then decode the body.
///
/// Errors carry the id of the request they answer.
fn check_request<'a>(
    service: Option<&'a Arc<dyn TaxiiService>>,
    path: &str,
    content_type: &str,
    headers: &Headers,
    body: &[u8],
) -> std::result::Result<(&'a Arc<dyn TaxiiService>, VersionedMessage), (String, TaxiiError)> {
    let message = transform::parse_message(content_type, body, true)
        .map_err(|err| (UNKNOWN_MESSAGE_ID.to_string(), err))?;
    let version = message.version();
    let message_id = message.message_id().to_string();
    let fail = |err: TaxiiError| (message_id.clone(), err);

    let service = service.ok_or_else(|| fail(TaxiiError::not_found(path)))?;
    let definition = service.definition();

    if let Some(services) = headers.get(HTTP_X_TAXII_SERVICES) {
        if ProtocolVersion::from_services_binding(services) != Some(version) {
            return Err(fail(TaxiiError::BadMessage(format!(
                "services version {services} does not match message binding {}",
                version.message_binding()
            ))));
        }
    }

    let protocol = headers.get(HTTP_X_TAXII_PROTOCOL);
    if !protocol.is_some_and(|p| definition.supports_protocol(p)) {
        return Err(fail(TaxiiError::UnsupportedProtocol {
            binding: protocol.map_or_else(
                || format!("missing {HTTP_X_TAXII_PROTOCOL} header"),
                ToString::to_string,
            ),
            supported: definition.protocol_bindings.clone(),
        }));
    }

    if !definition.available {
        return Err(fail(TaxiiError::Failure(format!(
            "service {} is not available",
            definition.id
        ))));
    }

    Ok((service, message))
}

fn build_service(
    service: &ServiceConfig,
    config: &ServerConfig,
    deployment: &Arc<Deployment>,
    manager: &DataManager,
) -> Arc<dyn TaxiiService> {
    let definition = service.to_entity();
    match service.service_type {
        ServiceType::Discovery => {
            let advertised: Vec<ServiceEntity> = service
                .advertised_services
                .iter()
                .filter_map(|id| config.services.iter().find(|s| &s.id == id))
                .map(ServiceConfig::to_entity)
                .collect();
            Arc::new(DiscoveryService::new(
                definition,
                Arc::clone(deployment),
                advertised,
            ))
        }
        ServiceType::CollectionManagement => Arc::new(CollectionManagementService::new(
            definition,
            Arc::clone(deployment),
            manager.clone(),
        )),
        ServiceType::Poll => Arc::new(PollService::new(definition, manager.clone())),
        ServiceType::Inbox => Arc::new(InboxService::new(
            definition,
            manager.clone(),
            service.inbox_settings(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture_config, fixture_server, headers_for, COLLECTION_OPEN};
    use taxii_core::constants::{
        HTTP_CONTENT_TYPE, VID_TAXII_HTTP_10, VID_TAXII_SERVICES_10, VID_TAXII_XML_10,
        VID_TAXII_XML_11,
    };
    use taxii_core::{tm10, tm11, StatusType};

    fn decode(version: ProtocolVersion, response: &RawResponse) -> VersionedMessage {
        transform::parse_message(version.message_binding(), &response.body, true).unwrap()
    }

    fn status_of(message: VersionedMessage) -> StatusType {
        match message {
            VersionedMessage::V11(tm11::Message::StatusMessage(s)) => s.status_type,
            VersionedMessage::V10(tm10::Message::StatusMessage(s)) => s.status_type,
            other => panic!("expected status, got {other:?}"),
        }
    }

    const DISCOVERY_11: &[u8] = br#"{"message_type": "Discovery_Request", "message_id": "d-1"}"#;

    #[tokio::test]
    async fn test_registry_lookups() {
        let server = fixture_server().await;
        assert_eq!(server.services().len(), 5);
        assert!(server.get_service("poll-A").is_some());
        assert!(server.get_service("poll-Z").is_none());

        let by_path = server.get_service_by_path("/services/poll-a/").unwrap();
        assert_eq!(by_path.definition().id, "poll-A");
        assert!(server.get_service_by_path("/services/nowhere").is_none());
    }

    #[tokio::test]
    async fn test_discovery_round_trip() {
        let server = fixture_server().await;
        let headers = headers_for(ProtocolVersion::V11, false);
        let response = server
            .handle("/services/discovery-a", &headers, DISCOVERY_11)
            .await
            .unwrap();

        assert_eq!(
            response.headers.get(HTTP_X_TAXII_CONTENT_TYPE),
            Some(VID_TAXII_XML_11)
        );
        assert_eq!(response.headers.get(HTTP_X_TAXII_PROTOCOL), Some(VID_TAXII_HTTP_10));
        assert!(response.headers.get(HTTP_CONTENT_TYPE).is_some());

        let VersionedMessage::V11(tm11::Message::DiscoveryResponse(discovery)) =
            decode(ProtocolVersion::V11, &response)
        else {
            panic!("expected discovery response");
        };
        assert_eq!(discovery.in_response_to, "d-1");
        assert!(!discovery.service_instances.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_message_binding_is_an_error() {
        let server = fixture_server().await;
        let mut headers = headers_for(ProtocolVersion::V11, false);
        headers.insert(HTTP_X_TAXII_CONTENT_TYPE, "urn:taxii.mitre.org:message:xml:2.0");

        let err = server
            .handle("/services/discovery-a", &headers, DISCOVERY_11)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_taxii(),
            Some(TaxiiError::UnsupportedVersion(_))
        ));
    }

    #[tokio::test]
    async fn test_message_binding_not_served_by_service() {
        let mut config = fixture_config();
        config.services[0].message_bindings = vec![VID_TAXII_XML_10.into()];
        let server = TaxiiServer::from_config(&config, Arc::new(MemoryRepository::new()))
            .await
            .unwrap();

        let err = server
            .handle(
                "/services/discovery-a",
                &headers_for(ProtocolVersion::V11, false),
                DISCOVERY_11,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_taxii(),
            Some(TaxiiError::UnsupportedVersion(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_message() {
        let server = fixture_server().await;
        let headers = headers_for(ProtocolVersion::V10, false);
        let response = server
            .handle("/services/discovery-a", &headers, b"garbage")
            .await
            .unwrap();
        assert_eq!(
            status_of(decode(ProtocolVersion::V10, &response)),
            StatusType::BadMessage
        );
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let server = fixture_server().await;
        let headers = headers_for(ProtocolVersion::V11, false);
        let response = server
            .handle("/services/nowhere", &headers, DISCOVERY_11)
            .await
            .unwrap();
        assert_eq!(
            status_of(decode(ProtocolVersion::V11, &response)),
            StatusType::NotFound
        );
    }

    #[tokio::test]
    async fn test_protocol_binding_not_offered() {
        let server = fixture_server().await;
        // inbox-A is offered over plain HTTP only.
        let headers = headers_for(ProtocolVersion::V11, true);
        let body = br#"{"message_type": "Inbox_Message", "message_id": "i-1", "content_blocks": []}"#;
        let response = server
            .handle("/services/inbox-a", &headers, body)
            .await
            .unwrap();
        let VersionedMessage::V11(tm11::Message::StatusMessage(status)) =
            decode(ProtocolVersion::V11, &response)
        else {
            panic!("expected status");
        };
        assert_eq!(status.status_type, StatusType::UnsupportedProtocol);
        assert_eq!(
            status.status_detail[taxii_core::status::SD_SUPPORTED_PROTOCOL],
            vec![VID_TAXII_HTTP_10.to_string()]
        );
    }

    #[tokio::test]
    async fn test_services_header_must_match_binding() {
        let server = fixture_server().await;
        let mut headers = headers_for(ProtocolVersion::V11, false);
        headers.insert(HTTP_X_TAXII_SERVICES, VID_TAXII_SERVICES_10);
        let response = server
            .handle("/services/discovery-a", &headers, DISCOVERY_11)
            .await
            .unwrap();
        assert_eq!(
            status_of(decode(ProtocolVersion::V11, &response)),
            StatusType::BadMessage
        );
    }

    #[tokio::test]
    async fn test_accept_header_selects_reply_version() {
        let server = fixture_server().await;
        let mut headers = headers_for(ProtocolVersion::V11, false);
        headers.insert(HTTP_X_TAXII_ACCEPT, VID_TAXII_XML_10);
        let response = server
            .handle("/services/discovery-a", &headers, DISCOVERY_11)
            .await
            .unwrap();
        assert_eq!(
            response.headers.get(HTTP_X_TAXII_CONTENT_TYPE),
            Some(VID_TAXII_XML_10)
        );
        assert!(matches!(
            decode(ProtocolVersion::V10, &response),
            VersionedMessage::V10(tm10::Message::DiscoveryResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_inbox_then_poll_over_http() {
        let server = fixture_server().await;
        let headers = headers_for(ProtocolVersion::V11, false);

        let inbox = format!(
            r#"{{"message_type": "Inbox_Message", "message_id": "i-9",
                "destination_collection_names": ["{COLLECTION_OPEN}"],
                "content_blocks": [{{"content_binding": {{"binding_id": "urn:stix.mitre.org:xml:1.1.1"}},
                                     "content": "<stix:Package/>"}}]}}"#
        );
        let response = server
            .handle("/services/inbox-a", &headers, inbox.as_bytes())
            .await
            .unwrap();
        assert_eq!(
            status_of(decode(ProtocolVersion::V11, &response)),
            StatusType::Success
        );

        let poll = format!(
            r#"{{"message_type": "Poll_Request", "message_id": "p-9",
                "collection_name": "{COLLECTION_OPEN}",
                "poll_parameters": {{"response_type": "FULL"}}}}"#
        );
        let response = server
            .handle("/services/poll-a", &headers, poll.as_bytes())
            .await
            .unwrap();
        let VersionedMessage::V11(tm11::Message::PollResponse(poll)) =
            decode(ProtocolVersion::V11, &response)
        else {
            panic!("expected poll response");
        };
        assert_eq!(poll.content_blocks.len(), 1);
        assert_eq!(poll.content_blocks[0].content, "<stix:Package/>");
    }

    #[tokio::test]
    async fn test_state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fixture_config();
        config.state_path = Some(dir.path().join("state.json"));

        let server = TaxiiServer::open(&config).await.unwrap();
        let open = server
            .manager()
            .get_collection(COLLECTION_OPEN, "poll-A")
            .await
            .unwrap()
            .unwrap();
        server
            .manager()
            .create_content(crate::test_support::stix_block("kept"), &[open.clone()])
            .await
            .unwrap();
        server.persist().await.unwrap();
        drop(server);

        let restarted = TaxiiServer::open(&config).await.unwrap();
        assert_eq!(
            restarted
                .manager()
                .get_collection_volume(&open, "poll-A")
                .await
                .unwrap(),
            1
        );
    }
}

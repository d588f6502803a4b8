//! TAXII service handlers.
//!
//! Every service implements [`TaxiiService`]: it declares which requests it
//! understands and turns a neutral [`Request`] into a neutral [`Response`].
//! Version handling lives in the provided [`TaxiiService::process`].

pub mod collection_management;
pub mod discovery;
pub mod inbox;
pub mod poll;

pub use collection_management::CollectionManagementService;
pub use discovery::DiscoveryService;
pub use inbox::{InboxService, MismatchPolicy};
pub use poll::PollService;

use async_trait::async_trait;
use std::collections::HashMap;
use taxii_core::constants::VID_TAXII_HTTPS_10;
use taxii_core::{
    ContentBindingEntity, EndpointInstance, ProtocolVersion, Request, RequestBody, Response,
    ServiceEntity, StatusResponse, TaxiiError, VersionedMessage,
};
use tracing::{debug, error, warn};

use crate::http::{response_version, Headers};
use crate::{transform, Result};

/// Per-request information handed to a service.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Version the request arrived in.
    pub version: ProtocolVersion,
    /// Request headers.
    pub headers: Headers,
}

/// A TAXII service endpoint.
#[async_trait]
pub trait TaxiiService: Send + Sync {
    /// Configured identity of the service.
    fn definition(&self) -> &ServiceEntity;

    /// Returns true if the service answers this kind of request.
    fn handles(&self, body: &RequestBody) -> bool;

    /// Answer a request the service handles.
    async fn handle(&self, ctx: &RequestContext, request: Request) -> Result<Response>;

    /// Answer a wire message, in the version the client accepts.
    ///
    /// Faults come back as status messages; this never fails.
    async fn process(&self, headers: &Headers, message: VersionedMessage) -> VersionedMessage {
        let version = message.version();
        let reply_version = response_version(headers, version);
        let message_id = message.message_id().to_string();
        let service = &self.definition().id;

        let outcome: Result<Response> = match transform::to_request(message) {
            Ok(request) if !self.handles(&request.body) => {
                Err(TaxiiError::UnsupportedMessage(format!(
                    "{} is not handled by service {service}",
                    request.body.name()
                ))
                .into())
            }
            Ok(request) => {
                debug!(service = %service, kind = request.body.name(), %version, "handling request");
                let ctx = RequestContext {
                    version,
                    headers: headers.clone(),
                };
                self.handle(&ctx, request).await
            }
            Err(err) => Err(err.into()),
        };

        let response = outcome.unwrap_or_else(|err| {
            if err.as_taxii().is_some() {
                warn!(service = %service, message_id = %message_id, error = %err, "request rejected");
            } else {
                error!(service = %service, message_id = %message_id, error = %err, "request failed");
            }
            Response::Status(err.to_status())
        });

        transform::to_message(reply_version, &message_id, response)
    }
}

/// What every service knows about the deployment it runs in.
#[derive(Debug, Clone, Default)]
pub struct Deployment {
    domain: String,
    inbox_content: HashMap<String, Vec<ContentBindingEntity>>,
}

impl Deployment {
    /// Deployment served under `domain`.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            inbox_content: HashMap::new(),
        }
    }

    /// Record the content an inbox advertises (empty means any).
    #[must_use]
    pub fn with_inbox_content(
        mut self,
        service_id: impl Into<String>,
        content: Vec<ContentBindingEntity>,
    ) -> Self {
        self.inbox_content.insert(service_id.into(), content);
        self
    }

    /// Host the service paths are relative to.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Content an inbox service advertises.
    #[must_use]
    pub fn inbox_accepted_content(&self, service_id: &str) -> Vec<ContentBindingEntity> {
        self.inbox_content
            .get(service_id)
            .cloned()
            .unwrap_or_default()
    }

    /// One endpoint per protocol binding of the service.
    #[must_use]
    pub fn endpoint_instances(&self, service: &ServiceEntity) -> Vec<EndpointInstance> {
        service
            .protocol_bindings
            .iter()
            .map(|binding| EndpointInstance {
                protocol_binding: binding.clone(),
                address: self.absolute_address(binding, &service.address),
                message_bindings: service.message_bindings.clone(),
            })
            .collect()
    }

    /// Endpoints of several services, service-then-binding order.
    #[must_use]
    pub fn endpoints_of(&self, services: &[ServiceEntity]) -> Vec<EndpointInstance> {
        services
            .iter()
            .flat_map(|s| self.endpoint_instances(s))
            .collect()
    }

    fn absolute_address(&self, protocol_binding: &str, path: &str) -> String {
        let scheme = if protocol_binding == VID_TAXII_HTTPS_10 {
            "https"
        } else {
            "http"
        };
        format!("{scheme}://{}{path}", self.domain)
    }
}

/// Status response for a successful request without a payload.
pub(crate) fn success(message: impl Into<String>) -> Response {
    Response::Status(StatusResponse::success(Some(message.into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture_server, request_message};
    use taxii_core::constants::{VID_TAXII_HTTP_10, VID_TAXII_XML_10};
    use taxii_core::{tm11, MessageKind, StatusType};

    #[test]
    fn test_endpoint_scheme_follows_protocol_binding() {
        let deployment = Deployment::new("taxii.example.com");
        let service = ServiceEntity {
            id: "poll".into(),
            service_type: taxii_core::ServiceType::Poll,
            address: "/services/poll".into(),
            description: None,
            protocol_bindings: vec![VID_TAXII_HTTP_10.into(), VID_TAXII_HTTPS_10.into()],
            message_bindings: vec![VID_TAXII_XML_10.into()],
            available: true,
        };

        let endpoints = deployment.endpoint_instances(&service);
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].address, "http://taxii.example.com/services/poll");
        assert_eq!(endpoints[1].address, "https://taxii.example.com/services/poll");
        assert_eq!(endpoints[1].message_bindings, vec![VID_TAXII_XML_10]);
    }

    #[tokio::test]
    async fn test_unhandled_kind_is_unsupported_message() {
        let server = fixture_server().await;
        let poll = server.get_service("poll-A").unwrap();

        let reply = poll
            .process(
                &Headers::new(),
                request_message(tm11::Message::DiscoveryRequest(tm11::DiscoveryRequest {
                    message_id: "1".into(),
                })),
            )
            .await;

        let VersionedMessage::V11(tm11::Message::StatusMessage(status)) = reply else {
            panic!("expected a 1.1 status message");
        };
        assert_eq!(status.status_type, StatusType::UnsupportedMessage);
        assert_eq!(status.in_response_to, "1");
    }

    #[tokio::test]
    async fn test_response_message_is_not_a_request() {
        let server = fixture_server().await;
        let discovery = server.get_service("discovery-A").unwrap();

        let reply = discovery
            .process(
                &Headers::new(),
                request_message(tm11::Message::StatusMessage(tm11::StatusMessage {
                    message_id: "2".into(),
                    in_response_to: "1".into(),
                    status_type: StatusType::Success,
                    status_detail: taxii_core::StatusDetail::new(),
                    message: None,
                })),
            )
            .await;
        assert_eq!(reply.kind(), MessageKind::StatusMessage);
    }
}

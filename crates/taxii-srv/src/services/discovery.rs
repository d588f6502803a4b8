//! Discovery service: advertises the configured services.

use async_trait::async_trait;
use std::sync::Arc;
use taxii_core::{
    DiscoveryResponse, Request, RequestBody, Response, ServiceEntity, ServiceInstance, ServiceType,
};

use super::{Deployment, RequestContext, TaxiiService};
use crate::Result;

/// Lists one instance per advertised service and protocol binding.
#[derive(Debug)]
pub struct DiscoveryService {
    definition: ServiceEntity,
    deployment: Arc<Deployment>,
    advertised: Vec<ServiceEntity>,
}

impl DiscoveryService {
    /// Discovery service advertising `advertised`, in that order.
    #[must_use]
    pub const fn new(
        definition: ServiceEntity,
        deployment: Arc<Deployment>,
        advertised: Vec<ServiceEntity>,
    ) -> Self {
        Self {
            definition,
            deployment,
            advertised,
        }
    }

    fn service_instances(&self) -> Vec<ServiceInstance> {
        let mut instances = Vec::new();
        for service in &self.advertised {
            let accepted = if service.service_type == ServiceType::Inbox {
                self.deployment.inbox_accepted_content(&service.id)
            } else {
                Vec::new()
            };
            for endpoint in self.deployment.endpoint_instances(service) {
                instances.push(ServiceInstance {
                    service_type: service.service_type,
                    endpoint,
                    inbox_accepted_content: accepted.clone(),
                    available: service.available,
                    message: service.description.clone(),
                });
            }
        }
        instances
    }
}

#[async_trait]
impl TaxiiService for DiscoveryService {
    fn definition(&self) -> &ServiceEntity {
        &self.definition
    }

    fn handles(&self, body: &RequestBody) -> bool {
        matches!(body, RequestBody::Discovery)
    }

    async fn handle(&self, _ctx: &RequestContext, _request: Request) -> Result<Response> {
        Ok(Response::Discovery(DiscoveryResponse {
            service_instances: self.service_instances(),
        }))
    }
}

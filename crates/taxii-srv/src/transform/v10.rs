//! TAXII 1.0 projection of the neutral model.
//!
//! 1.0 knows feeds instead of collections and bare binding ids instead of
//! bindings with subtypes; everything 1.1-only is dropped on the way out.

use chrono::Utc;
use taxii_core::constants::VID_TAXII_SERVICES_10;
use taxii_core::tm10::{self, Message};
use taxii_core::{
    ContentBindingEntity, ContentBlockEntity, EndpointInstance, InboxRequest,
    ManageSubscriptionRequest, PollParameters, PollRequest, PushParameters, Request, RequestBody,
    Response, ResponseType, ServiceType, StatusDetail, SubscriptionAction, SubscriptionParameters,
    TaxiiError, VersionedMessage,
};

pub(super) fn to_request(message: Message) -> taxii_core::Result<Request> {
    let (message_id, body) = match message {
        Message::DiscoveryRequest(m) => (m.message_id, RequestBody::Discovery),
        Message::FeedInformationRequest(m) => (m.message_id, RequestBody::CollectionInformation),
        Message::ManageFeedSubscriptionRequest(m) => {
            let (parameters, push_parameters) = match m.delivery_parameters {
                Some(d) => (
                    Some(SubscriptionParameters {
                        response_type: ResponseType::Full,
                        content_bindings: bindings_from_wire(d.content_bindings),
                    }),
                    Some(PushParameters {
                        protocol_binding: d.inbox_protocol,
                        address: d.inbox_address,
                        message_binding: d.delivery_message_binding,
                    }),
                ),
                None => (None, None),
            };
            (
                m.message_id,
                RequestBody::ManageSubscription(ManageSubscriptionRequest {
                    collection_name: m.feed_name,
                    action: action_from_wire(m.action),
                    subscription_id: m.subscription_id,
                    parameters,
                    push_parameters,
                }),
            )
        }
        Message::PollRequest(m) => {
            // A subscription poll without explicit bindings uses the
            // subscription's own parameters.
            let parameters = if m.subscription_id.is_some() && m.content_bindings.is_empty() {
                None
            } else {
                Some(PollParameters {
                    response_type: ResponseType::Full,
                    content_bindings: bindings_from_wire(m.content_bindings),
                })
            };
            (
                m.message_id,
                RequestBody::Poll(PollRequest {
                    collection_name: m.feed_name,
                    exclusive_begin: m.exclusive_begin_timestamp_label,
                    inclusive_end: m.inclusive_end_timestamp_label,
                    subscription_id: m.subscription_id,
                    parameters,
                }),
            )
        }
        Message::InboxMessage(m) => {
            let content_blocks = m
                .content_blocks
                .into_iter()
                .map(|b| ContentBlockEntity {
                    id: None,
                    content: b.content,
                    timestamp_label: b.timestamp_label.unwrap_or_else(Utc::now),
                    message: None,
                    content_binding: ContentBindingEntity::new(b.content_binding),
                    inbox_message_id: Some(m.message_id.clone()),
                })
                .collect();
            (
                m.message_id,
                RequestBody::Inbox(InboxRequest {
                    destination_collection_names: Vec::new(),
                    subscription_id: m.subscription_information.map(|s| s.subscription_id),
                    content_blocks,
                }),
            )
        }
        other => {
            return Err(TaxiiError::UnsupportedMessage(format!(
                "{:?} is not a request",
                VersionedMessage::from(other).kind()
            )));
        }
    };
    Ok(Request { message_id, body })
}

pub(super) fn to_message(message_id: String, in_response_to: &str, response: Response) -> Message {
    let in_response_to = in_response_to.to_string();
    match response {
        Response::Discovery(r) => Message::DiscoveryResponse(tm10::DiscoveryResponse {
            message_id,
            in_response_to,
            service_instances: r
                .service_instances
                .into_iter()
                .map(|s| tm10::ServiceInstance {
                    service_type: service_type_to_wire(s.service_type),
                    services_version: VID_TAXII_SERVICES_10.to_string(),
                    protocol_binding: s.endpoint.protocol_binding,
                    service_address: s.endpoint.address,
                    message_bindings: s.endpoint.message_bindings,
                    inbox_service_accepted_content: binding_ids(&s.inbox_accepted_content),
                    available: Some(s.available),
                    message: s.message,
                })
                .collect(),
        }),
        Response::CollectionInformation(r) => {
            Message::FeedInformationResponse(tm10::FeedInformationResponse {
                message_id,
                in_response_to,
                feed_informations: r
                    .collections
                    .into_iter()
                    .map(|c| tm10::FeedInformation {
                        feed_name: c.name,
                        feed_description: c.description,
                        supported_contents: binding_ids(&c.supported_content),
                        available: c.available,
                        polling_service_instances: c
                            .polling_service_instances
                            .into_iter()
                            .map(|e| tm10::PollingServiceInstance {
                                poll_protocol: e.protocol_binding,
                                poll_address: e.address,
                                poll_message_bindings: e.message_bindings,
                            })
                            .collect(),
                        subscription_methods: c
                            .subscription_methods
                            .into_iter()
                            .map(|e| tm10::SubscriptionMethod {
                                subscription_protocol: e.protocol_binding,
                                subscription_address: e.address,
                                subscription_message_bindings: e.message_bindings,
                            })
                            .collect(),
                        receiving_inbox_services: c
                            .receiving_inbox_services
                            .into_iter()
                            .map(|i| tm10::ReceivingInboxService {
                                inbox_protocol: i.endpoint.protocol_binding,
                                inbox_address: i.endpoint.address,
                                inbox_message_bindings: i.endpoint.message_bindings,
                                supported_contents: binding_ids(&i.supported_content),
                            })
                            .collect(),
                    })
                    .collect(),
            })
        }
        Response::ManageSubscription(r) => {
            Message::ManageFeedSubscriptionResponse(tm10::ManageFeedSubscriptionResponse {
                message_id,
                in_response_to,
                feed_name: r.collection_name,
                message: r.message,
                subscription_instances: r
                    .subscriptions
                    .into_iter()
                    .map(|s| {
                        let content_bindings = s
                            .parameters
                            .as_ref()
                            .map(|p| binding_ids(&p.content_bindings))
                            .unwrap_or_default();
                        tm10::SubscriptionInstance {
                            subscription_id: s.subscription_id,
                            delivery_parameters: s
                                .push_parameters
                                .map(|p| tm10::DeliveryParameters {
                                    inbox_protocol: p.protocol_binding,
                                    inbox_address: p.address,
                                    delivery_message_binding: p.message_binding,
                                    content_bindings,
                                })
                                .into_iter()
                                .collect(),
                            poll_instances: s.poll_instances.into_iter().map(poll_instance).collect(),
                        }
                    })
                    .collect(),
            })
        }
        Response::Poll(r) => Message::PollResponse(tm10::PollResponse {
            message_id,
            in_response_to,
            feed_name: r.collection_name,
            // 1.0 only has an inclusive begin, which an exclusive bound cannot express.
            inclusive_begin_timestamp_label: None,
            inclusive_end_timestamp_label: r.inclusive_end,
            subscription_id: r.subscription_id,
            message: r.message,
            content_blocks: r
                .content_blocks
                .into_iter()
                .map(|b| tm10::ContentBlock {
                    content_binding: b.content_binding.binding,
                    content: b.content,
                    timestamp_label: Some(b.timestamp_label),
                    padding: None,
                })
                .collect(),
        }),
        Response::Status(r) => Message::StatusMessage(tm10::StatusMessage {
            message_id,
            in_response_to,
            status_type: r.status_type.for_v10(),
            status_detail: flatten_detail(&r.detail),
            message: r.message,
        }),
    }
}

fn poll_instance(endpoint: EndpointInstance) -> tm10::PollInstance {
    tm10::PollInstance {
        poll_protocol: endpoint.protocol_binding,
        poll_address: endpoint.address,
        poll_message_bindings: endpoint.message_bindings,
    }
}

const fn action_from_wire(action: tm10::Action) -> SubscriptionAction {
    match action {
        tm10::Action::Subscribe => SubscriptionAction::Subscribe,
        tm10::Action::Unsubscribe => SubscriptionAction::Unsubscribe,
        tm10::Action::Status => SubscriptionAction::Status,
    }
}

const fn service_type_to_wire(service_type: ServiceType) -> tm10::ServiceType {
    match service_type {
        ServiceType::Discovery => tm10::ServiceType::Discovery,
        ServiceType::CollectionManagement => tm10::ServiceType::FeedManagement,
        ServiceType::Poll => tm10::ServiceType::Poll,
        ServiceType::Inbox => tm10::ServiceType::Inbox,
    }
}

fn bindings_from_wire(bindings: Vec<String>) -> Vec<ContentBindingEntity> {
    bindings.into_iter().map(ContentBindingEntity::new).collect()
}

/// One binding id per configured binding; subtypes have no 1.0 form.
fn binding_ids(bindings: &[ContentBindingEntity]) -> Vec<String> {
    bindings.iter().map(|b| b.binding.clone()).collect()
}

/// 1.0 status details are free text.
fn flatten_detail(detail: &StatusDetail) -> Option<String> {
    if detail.is_empty() {
        return None;
    }
    let parts: Vec<String> = detail
        .iter()
        .map(|(key, values)| format!("{key}: {}", values.join(", ")))
        .collect();
    Some(parts.join("; "))
}

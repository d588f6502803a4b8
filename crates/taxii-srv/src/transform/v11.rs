//! TAXII 1.1 projection of the neutral model.

use chrono::Utc;
use taxii_core::constants::VID_TAXII_SERVICES_11;
use taxii_core::tm11::{self, Message};
use taxii_core::{
    ContentBindingEntity, ContentBlockEntity, EndpointInstance, InboxRequest,
    ManageSubscriptionRequest, PollParameters, PollRequest, PushParameters, Request, RequestBody,
    Response, ServiceType, SubscriptionAction, SubscriptionParameters, TaxiiError,
    VersionedMessage,
};

pub(super) fn to_request(message: Message) -> taxii_core::Result<Request> {
    let (message_id, body) = match message {
        Message::DiscoveryRequest(m) => (m.message_id, RequestBody::Discovery),
        Message::CollectionInformationRequest(m) => {
            (m.message_id, RequestBody::CollectionInformation)
        }
        Message::ManageCollectionSubscriptionRequest(m) => (
            m.message_id,
            RequestBody::ManageSubscription(ManageSubscriptionRequest {
                collection_name: m.collection_name,
                action: action_from_wire(m.action),
                subscription_id: m.subscription_id,
                parameters: m.subscription_parameters.map(|p| SubscriptionParameters {
                    response_type: p.response_type,
                    content_bindings: bindings_from_wire(p.content_bindings),
                }),
                push_parameters: m.push_parameters.map(|p| PushParameters {
                    protocol_binding: p.inbox_protocol,
                    address: p.inbox_address,
                    message_binding: p.delivery_message_binding,
                }),
            }),
        ),
        Message::PollRequest(m) => (
            m.message_id,
            RequestBody::Poll(PollRequest {
                collection_name: m.collection_name,
                exclusive_begin: m.exclusive_begin_timestamp_label,
                inclusive_end: m.inclusive_end_timestamp_label,
                subscription_id: m.subscription_id,
                parameters: m.poll_parameters.map(|p| PollParameters {
                    response_type: p.response_type,
                    content_bindings: bindings_from_wire(p.content_bindings),
                }),
            }),
        ),
        Message::InboxMessage(m) => {
            let content_blocks = m
                .content_blocks
                .into_iter()
                .map(|b| ContentBlockEntity {
                    id: None,
                    content: b.content,
                    timestamp_label: b.timestamp_label.unwrap_or_else(Utc::now),
                    message: b.message,
                    content_binding: binding_from_wire(b.content_binding),
                    inbox_message_id: Some(m.message_id.clone()),
                })
                .collect();
            (
                m.message_id,
                RequestBody::Inbox(InboxRequest {
                    destination_collection_names: m.destination_collection_names,
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
        Response::Discovery(r) => Message::DiscoveryResponse(tm11::DiscoveryResponse {
            message_id,
            in_response_to,
            service_instances: r
                .service_instances
                .into_iter()
                .map(|s| tm11::ServiceInstance {
                    service_type: service_type_to_wire(s.service_type),
                    services_version: VID_TAXII_SERVICES_11.to_string(),
                    protocol_binding: s.endpoint.protocol_binding,
                    service_address: s.endpoint.address,
                    message_bindings: s.endpoint.message_bindings,
                    inbox_service_accepted_content: bindings_to_wire(&s.inbox_accepted_content),
                    available: Some(s.available),
                    message: s.message,
                })
                .collect(),
        }),
        Response::CollectionInformation(r) => {
            Message::CollectionInformationResponse(tm11::CollectionInformationResponse {
                message_id,
                in_response_to,
                collection_informations: r
                    .collections
                    .into_iter()
                    .map(|c| tm11::CollectionInformation {
                        collection_name: c.name,
                        collection_description: c.description,
                        supported_contents: bindings_to_wire(&c.supported_content),
                        available: c.available,
                        collection_volume: Some(c.volume),
                        collection_type: c.collection_type,
                        polling_service_instances: c
                            .polling_service_instances
                            .into_iter()
                            .map(|e| tm11::PollingServiceInstance {
                                poll_protocol: e.protocol_binding,
                                poll_address: e.address,
                                poll_message_bindings: e.message_bindings,
                            })
                            .collect(),
                        subscription_methods: c
                            .subscription_methods
                            .into_iter()
                            .map(|e| tm11::SubscriptionMethod {
                                subscription_protocol: e.protocol_binding,
                                subscription_address: e.address,
                                subscription_message_bindings: e.message_bindings,
                            })
                            .collect(),
                        receiving_inbox_services: c
                            .receiving_inbox_services
                            .into_iter()
                            .map(|i| tm11::ReceivingInboxService {
                                inbox_protocol: i.endpoint.protocol_binding,
                                inbox_address: i.endpoint.address,
                                inbox_message_bindings: i.endpoint.message_bindings,
                                supported_contents: bindings_to_wire(&i.supported_content),
                            })
                            .collect(),
                    })
                    .collect(),
            })
        }
        Response::ManageSubscription(r) => Message::ManageCollectionSubscriptionResponse(
            tm11::ManageCollectionSubscriptionResponse {
                message_id,
                in_response_to,
                collection_name: r.collection_name,
                message: r.message,
                subscription_instances: r
                    .subscriptions
                    .into_iter()
                    .map(|s| tm11::SubscriptionInstance {
                        subscription_id: s.subscription_id,
                        status: s.status,
                        subscription_parameters: s.parameters.map(|p| {
                            tm11::SubscriptionParameters {
                                response_type: p.response_type,
                                content_bindings: bindings_to_wire(&p.content_bindings),
                            }
                        }),
                        push_parameters: s.push_parameters.map(|p| tm11::PushParameters {
                            inbox_protocol: p.protocol_binding,
                            inbox_address: p.address,
                            delivery_message_binding: p.message_binding,
                        }),
                        poll_instances: s.poll_instances.into_iter().map(poll_instance).collect(),
                    })
                    .collect(),
            },
        ),
        Response::Poll(r) => Message::PollResponse(tm11::PollResponse {
            message_id,
            in_response_to,
            collection_name: r.collection_name,
            exclusive_begin_timestamp_label: r.exclusive_begin,
            inclusive_end_timestamp_label: r.inclusive_end,
            subscription_id: r.subscription_id,
            message: r.message,
            record_count: Some(tm11::RecordCount {
                record_count: r.record_count,
                partial_count: false,
            }),
            more: false,
            result_id: None,
            result_part_number: 1,
            content_blocks: r
                .content_blocks
                .into_iter()
                .map(|b| tm11::ContentBlock {
                    content_binding: binding_to_wire(&b.content_binding),
                    content: b.content,
                    timestamp_label: Some(b.timestamp_label),
                    message: b.message,
                })
                .collect(),
        }),
        Response::Status(r) => Message::StatusMessage(tm11::StatusMessage {
            message_id,
            in_response_to,
            status_type: r.status_type,
            status_detail: r.detail,
            message: r.message,
        }),
    }
}

fn poll_instance(endpoint: EndpointInstance) -> tm11::PollInstance {
    tm11::PollInstance {
        poll_protocol: endpoint.protocol_binding,
        poll_address: endpoint.address,
        poll_message_bindings: endpoint.message_bindings,
    }
}

const fn action_from_wire(action: tm11::Action) -> SubscriptionAction {
    match action {
        tm11::Action::Subscribe => SubscriptionAction::Subscribe,
        tm11::Action::Unsubscribe => SubscriptionAction::Unsubscribe,
        tm11::Action::Pause => SubscriptionAction::Pause,
        tm11::Action::Resume => SubscriptionAction::Resume,
        tm11::Action::Status => SubscriptionAction::Status,
    }
}

const fn service_type_to_wire(service_type: ServiceType) -> tm11::ServiceType {
    match service_type {
        ServiceType::Discovery => tm11::ServiceType::Discovery,
        ServiceType::CollectionManagement => tm11::ServiceType::CollectionManagement,
        ServiceType::Poll => tm11::ServiceType::Poll,
        ServiceType::Inbox => tm11::ServiceType::Inbox,
    }
}

fn binding_from_wire(binding: tm11::ContentBinding) -> ContentBindingEntity {
    ContentBindingEntity {
        binding: binding.binding_id,
        subtypes: binding.subtype_ids,
    }
}

fn bindings_from_wire(bindings: Vec<tm11::ContentBinding>) -> Vec<ContentBindingEntity> {
    bindings.into_iter().map(binding_from_wire).collect()
}

fn binding_to_wire(binding: &ContentBindingEntity) -> tm11::ContentBinding {
    tm11::ContentBinding {
        binding_id: binding.binding.clone(),
        subtype_ids: binding.subtypes.clone(),
    }
}

fn bindings_to_wire(bindings: &[ContentBindingEntity]) -> Vec<tm11::ContentBinding> {
    bindings.iter().map(binding_to_wire).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxii_core::{ResponseType, StatusResponse, StatusType};

    #[test]
    fn test_inbox_blocks_remember_their_message() {
        let message = Message::InboxMessage(tm11::InboxMessage {
            message_id: "m-1".into(),
            message: None,
            result_id: None,
            destination_collection_names: vec!["c".into()],
            subscription_information: None,
            record_count: None,
            content_blocks: vec![tm11::ContentBlock {
                content_binding: tm11::ContentBinding {
                    binding_id: "urn:stix".into(),
                    subtype_ids: vec!["indicator".into()],
                },
                content: "<stix/>".into(),
                timestamp_label: None,
                message: None,
            }],
        });

        let request = to_request(message).unwrap();
        let RequestBody::Inbox(inbox) = request.body else {
            panic!("expected inbox");
        };
        assert_eq!(inbox.destination_collection_names, vec!["c"]);
        assert_eq!(inbox.content_blocks[0].inbox_message_id.as_deref(), Some("m-1"));
        assert_eq!(inbox.content_blocks[0].content_binding.subtypes, vec!["indicator"]);
    }

    #[test]
    fn test_poll_parameters_are_carried_over() {
        let message = Message::PollRequest(tm11::PollRequest {
            message_id: "m-2".into(),
            collection_name: "c".into(),
            exclusive_begin_timestamp_label: None,
            inclusive_end_timestamp_label: None,
            subscription_id: None,
            poll_parameters: Some(tm11::PollParameters {
                allow_asynch: false,
                response_type: ResponseType::CountOnly,
                content_bindings: Vec::new(),
            }),
        });

        let RequestBody::Poll(poll) = to_request(message).unwrap().body else {
            panic!("expected poll");
        };
        assert_eq!(
            poll.parameters.map(|p| p.response_type),
            Some(ResponseType::CountOnly)
        );
    }

    #[test]
    fn test_responses_are_not_requests() {
        let message = to_message(
            "m-3".into(),
            "m-0",
            Response::Status(StatusResponse::success(None)),
        );
        assert!(matches!(
            to_request(message),
            Err(TaxiiError::UnsupportedMessage(_))
        ));
    }

    #[test]
    fn test_status_keeps_details() {
        let err = TaxiiError::not_found("feed-x");
        let Message::StatusMessage(status) = to_message(
            "m-4".into(),
            "m-0",
            Response::Status(StatusResponse::from_error(&err)),
        ) else {
            panic!("expected status");
        };
        assert_eq!(status.status_type, StatusType::NotFound);
        assert_eq!(status.in_response_to, "m-0");
        assert!(!status.status_detail.is_empty());
    }
}

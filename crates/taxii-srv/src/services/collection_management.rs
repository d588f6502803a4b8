//! Collection management: collection (feed) information and subscriptions.

use async_trait::async_trait;
use std::sync::Arc;
use taxii_core::{
    CollectionEntity, CollectionInformation, CollectionInformationResponse, EndpointInstance,
    ManageSubscriptionRequest, ManageSubscriptionResponse, ProtocolVersion, ReceivingInbox,
    Request, RequestBody, Response, ServiceEntity, ServiceType, SubscriptionAction,
    SubscriptionEntity, SubscriptionInstance, SubscriptionStatus, TaxiiError,
};
use tracing::info;

use super::{Deployment, RequestContext, TaxiiService};
use crate::data::DataManager;
use crate::Result;

/// Reports the collections assigned to it and manages their subscriptions.
#[derive(Debug)]
pub struct CollectionManagementService {
    definition: ServiceEntity,
    deployment: Arc<Deployment>,
    manager: DataManager,
}

impl CollectionManagementService {
    /// Service over the collections `manager` assigns to `definition`.
    #[must_use]
    pub const fn new(
        definition: ServiceEntity,
        deployment: Arc<Deployment>,
        manager: DataManager,
    ) -> Self {
        Self {
            definition,
            deployment,
            manager,
        }
    }

    async fn endpoints_for(
        &self,
        collection: &CollectionEntity,
        service_type: ServiceType,
    ) -> Result<Vec<EndpointInstance>> {
        let services = self
            .manager
            .get_services_for_collection(collection, service_type)
            .await?;
        Ok(self.deployment.endpoints_of(&services))
    }

    async fn describe(&self, collection: CollectionEntity) -> Result<CollectionInformation> {
        let volume = self
            .manager
            .get_collection_volume(&collection, &self.definition.id)
            .await?;

        let inboxes = self
            .manager
            .get_services_for_collection(&collection, ServiceType::Inbox)
            .await?;
        let receiving_inbox_services = inboxes
            .iter()
            .flat_map(|inbox| {
                let supported_content = self.deployment.inbox_accepted_content(&inbox.id);
                self.deployment
                    .endpoint_instances(inbox)
                    .into_iter()
                    .map(move |endpoint| ReceivingInbox {
                        endpoint,
                        supported_content: supported_content.clone(),
                    })
            })
            .collect();

        let polling_service_instances = self.endpoints_for(&collection, ServiceType::Poll).await?;
        let subscription_methods = self
            .endpoints_for(&collection, ServiceType::CollectionManagement)
            .await?;

        Ok(CollectionInformation {
            supported_content: collection.advertised_content().to_vec(),
            name: collection.name,
            description: collection.description,
            collection_type: collection.collection_type,
            available: collection.available,
            volume,
            receiving_inbox_services,
            polling_service_instances,
            subscription_methods,
        })
    }

    async fn collection_information(&self) -> Result<Response> {
        let collections = self.manager.get_collections(&self.definition.id).await?;
        let mut described = Vec::with_capacity(collections.len());
        for collection in collections {
            described.push(self.describe(collection).await?);
        }
        Ok(Response::CollectionInformation(
            CollectionInformationResponse {
                collections: described,
            },
        ))
    }

    async fn manage_subscription(
        &self,
        version: ProtocolVersion,
        request: ManageSubscriptionRequest,
    ) -> Result<Response> {
        let collection = self
            .manager
            .get_collection(&request.collection_name, &self.definition.id)
            .await?
            .ok_or_else(|| TaxiiError::not_found(&request.collection_name))?;
        let poll_instances = self.endpoints_for(&collection, ServiceType::Poll).await?;

        let subscriptions = match request.action {
            SubscriptionAction::Subscribe => {
                let created = self
                    .manager
                    .create_subscription(
                        &collection,
                        request.parameters,
                        request.push_parameters,
                    )
                    .await?;
                vec![created]
            }
            SubscriptionAction::Unsubscribe => {
                let id = required_id(request.subscription_id)?;
                match self.find_subscription(&collection, &id).await? {
                    Some(mut subscription) => {
                        subscription.status = SubscriptionStatus::Unsubscribed;
                        info!(subscription = %id, collection = %collection.name, "unsubscribed");
                        vec![self.manager.update_subscription(subscription).await?]
                    }
                    // Unknown ids are reported as unsubscribed all the same.
                    None => {
                        return Ok(respond(
                            &collection,
                            vec![SubscriptionInstance {
                                subscription_id: id,
                                status: SubscriptionStatus::Unsubscribed,
                                parameters: None,
                                push_parameters: None,
                                poll_instances,
                            }],
                        ));
                    }
                }
            }
            SubscriptionAction::Pause | SubscriptionAction::Resume => {
                if version == ProtocolVersion::V10 {
                    return Err(TaxiiError::BadMessage(
                        "PAUSE and RESUME do not exist in TAXII 1.0".into(),
                    )
                    .into());
                }
                let id = required_id(request.subscription_id)?;
                let mut subscription = self
                    .find_subscription(&collection, &id)
                    .await?
                    .ok_or_else(|| TaxiiError::not_found(&id))?;
                if subscription.status == SubscriptionStatus::Unsubscribed {
                    return Err(TaxiiError::Failure(format!(
                        "subscription {id} has been unsubscribed"
                    ))
                    .into());
                }
                subscription.status = if request.action == SubscriptionAction::Pause {
                    SubscriptionStatus::Paused
                } else {
                    SubscriptionStatus::Active
                };
                vec![self.manager.update_subscription(subscription).await?]
            }
            SubscriptionAction::Status => match request.subscription_id {
                Some(id) => vec![self
                    .find_subscription(&collection, &id)
                    .await?
                    .ok_or_else(|| TaxiiError::not_found(&id))?],
                None => self.manager.get_subscriptions(&collection).await?,
            },
        };

        let instances = subscriptions
            .into_iter()
            .map(|s| SubscriptionInstance {
                subscription_id: s.subscription_id,
                status: s.status,
                parameters: s.params,
                push_parameters: s.push_parameters,
                poll_instances: poll_instances.clone(),
            })
            .collect();
        Ok(respond(&collection, instances))
    }

    /// Subscription with this id, if it belongs to the collection.
    async fn find_subscription(
        &self,
        collection: &CollectionEntity,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionEntity>> {
        Ok(self
            .manager
            .get_subscription(subscription_id)
            .await?
            .filter(|s| Some(s.collection_id) == collection.id))
    }
}

fn respond(collection: &CollectionEntity, subscriptions: Vec<SubscriptionInstance>) -> Response {
    Response::ManageSubscription(ManageSubscriptionResponse {
        collection_name: collection.name.clone(),
        message: None,
        subscriptions,
    })
}

fn required_id(subscription_id: Option<String>) -> Result<String> {
    subscription_id
        .ok_or_else(|| TaxiiError::BadMessage("subscription_id is required".into()).into())
}

#[async_trait]
impl TaxiiService for CollectionManagementService {
    fn definition(&self) -> &ServiceEntity {
        &self.definition
    }

    fn handles(&self, body: &RequestBody) -> bool {
        matches!(
            body,
            RequestBody::CollectionInformation | RequestBody::ManageSubscription(_)
        )
    }

    async fn handle(&self, ctx: &RequestContext, request: Request) -> Result<Response> {
        match request.body {
            RequestBody::CollectionInformation => self.collection_information().await,
            RequestBody::ManageSubscription(manage) => {
                self.manage_subscription(ctx.version, manage).await
            }
            other => Err(TaxiiError::UnsupportedMessage(other.name().to_string()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::http::Headers;
    use crate::data::MemoryRepository;
    use crate::test_support::{
        fixture_config, fixture_server, request_message, stix_block, COLLECTION_DISABLED,
        COLLECTION_ONLY_STIX, COLLECTION_OPEN, COLLECTION_STIX_AND_CUSTOM,
    };
    use std::sync::Arc;
    use taxii_core::constants::CB_STIX_XML_111;
    use taxii_core::{
        tm10, tm11, CollectionType, ContentBindingEntity, StatusType, SubscriptionStatus,
        VersionedMessage,
    };

    const SERVICE: &str = "collection-management-A";

    async fn collection_information() -> tm11::CollectionInformationResponse {
        collection_information_of(&fixture_server().await).await
    }

    async fn collection_information_of(
        server: &crate::TaxiiServer,
    ) -> tm11::CollectionInformationResponse {
        let service = server.get_service(SERVICE).unwrap();
        let reply = service
            .process(
                &Headers::new(),
                request_message(tm11::Message::CollectionInformationRequest(
                    tm11::CollectionInformationRequest {
                        message_id: "1".into(),
                    },
                )),
            )
            .await;
        match reply {
            VersionedMessage::V11(tm11::Message::CollectionInformationResponse(r)) => r,
            other => panic!("unexpected reply {other:?}"),
        }
    }

    async fn manage(
        server: &crate::TaxiiServer,
        collection: &str,
        action: tm11::Action,
        subscription_id: Option<&str>,
    ) -> tm11::Message {
        let service = server.get_service(SERVICE).unwrap();
        let reply = service
            .process(
                &Headers::new(),
                request_message(tm11::Message::ManageCollectionSubscriptionRequest(
                    tm11::ManageCollectionSubscriptionRequest {
                        message_id: "7".into(),
                        collection_name: collection.into(),
                        action,
                        subscription_id: subscription_id.map(Into::into),
                        subscription_parameters: None,
                        push_parameters: None,
                    },
                )),
            )
            .await;
        match reply {
            VersionedMessage::V11(message) => message,
            VersionedMessage::V10(_) => panic!("expected a 1.1 reply"),
        }
    }

    fn subscription_instances(message: tm11::Message) -> Vec<tm11::SubscriptionInstance> {
        match message {
            tm11::Message::ManageCollectionSubscriptionResponse(r) => r.subscription_instances,
            other => panic!("unexpected reply {other:?}"),
        }
    }

    async fn feed_information_of(server: &crate::TaxiiServer) -> tm10::FeedInformationResponse {
        let reply = server
            .get_service(SERVICE)
            .unwrap()
            .process(
                &Headers::new(),
                VersionedMessage::V10(tm10::Message::FeedInformationRequest(
                    tm10::FeedInformationRequest {
                        message_id: "2".into(),
                    },
                )),
            )
            .await;
        match reply {
            VersionedMessage::V10(tm10::Message::FeedInformationResponse(r)) => r,
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_volume_counts_stored_blocks() {
        let server = fixture_server().await;
        let manager = server.manager();
        let open = manager
            .get_collection(COLLECTION_OPEN, SERVICE)
            .await
            .unwrap()
            .unwrap();
        for i in 0..10 {
            let block = stix_block(&format!("<stix id=\"{i}\"/>"));
            manager
                .create_content(block, std::slice::from_ref(&open))
                .await
                .unwrap();
        }

        let response = collection_information_of(&server).await;
        let volumes: Vec<Option<u64>> = response
            .collection_informations
            .iter()
            .map(|c| c.collection_volume)
            .collect();
        assert_eq!(volumes, vec![Some(10), Some(0), Some(0), Some(0)]);
    }

    #[tokio::test]
    async fn test_supported_content_count_is_the_same_in_both_versions() {
        let mut config = fixture_config();
        let open = &mut config.collections[0];
        open.accept_all_content = false;
        open.supported_content = vec![
            ContentBindingEntity::new(CB_STIX_XML_111).with_subtypes(["a"]),
            ContentBindingEntity::new(CB_STIX_XML_111).with_subtypes(["b"]),
        ];
        let server = crate::TaxiiServer::from_config(&config, Arc::new(MemoryRepository::new()))
            .await
            .unwrap();

        let v11 = collection_information_of(&server).await;
        let v10 = feed_information_of(&server).await;
        assert_eq!(v11.collection_informations[0].supported_contents.len(), 2);
        assert_eq!(v10.feed_informations[0].supported_contents.len(), 2);
    }

    #[tokio::test]
    async fn test_all_assigned_collections_are_listed() {
        let response = collection_information().await;
        let names: Vec<&str> = response
            .collection_informations
            .iter()
            .map(|c| c.collection_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                COLLECTION_OPEN,
                COLLECTION_ONLY_STIX,
                COLLECTION_STIX_AND_CUSTOM,
                COLLECTION_DISABLED
            ]
        );
    }

    #[tokio::test]
    async fn test_collection_details() {
        let response = collection_information().await;
        let find = |name: &str| {
            response
                .collection_informations
                .iter()
                .find(|c| c.collection_name == name)
                .unwrap()
                .clone()
        };

        let open = find(COLLECTION_OPEN);
        assert_eq!(open.collection_type, CollectionType::Set);
        assert!(open.supported_contents.is_empty());
        assert_eq!(open.collection_volume, Some(0));
        // inbox-A has one binding, inbox-B two
        assert_eq!(open.receiving_inbox_services.len(), 3);
        assert_eq!(open.polling_service_instances.len(), 2);
        assert_eq!(open.subscription_methods.len(), 2);

        assert_eq!(find(COLLECTION_ONLY_STIX).supported_contents.len(), 1);
        assert_eq!(find(COLLECTION_STIX_AND_CUSTOM).supported_contents.len(), 2);
        assert!(!find(COLLECTION_DISABLED).available);
    }

    #[tokio::test]
    async fn test_feed_information_in_10() {
        let server = fixture_server().await;
        let service = server.get_service(SERVICE).unwrap();
        let reply = service
            .process(
                &Headers::new(),
                VersionedMessage::V10(tm10::Message::FeedInformationRequest(
                    tm10::FeedInformationRequest {
                        message_id: "1".into(),
                    },
                )),
            )
            .await;
        let VersionedMessage::V10(tm10::Message::FeedInformationResponse(response)) = reply else {
            panic!("expected feed information");
        };
        assert_eq!(response.feed_informations.len(), 4);
        assert_eq!(response.feed_informations[0].feed_name, COLLECTION_OPEN);
        assert_eq!(response.feed_informations[0].receiving_inbox_services.len(), 3);
    }

    #[tokio::test]
    async fn test_subscription_lifecycle() {
        let server = fixture_server().await;

        let created =
            subscription_instances(manage(&server, COLLECTION_OPEN, tm11::Action::Subscribe, None).await);
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].status, SubscriptionStatus::Active);
        assert_eq!(created[0].poll_instances.len(), 2);
        let id = created[0].subscription_id.clone();

        let paused = subscription_instances(
            manage(&server, COLLECTION_OPEN, tm11::Action::Pause, Some(&id)).await,
        );
        assert_eq!(paused[0].status, SubscriptionStatus::Paused);

        let resumed = subscription_instances(
            manage(&server, COLLECTION_OPEN, tm11::Action::Resume, Some(&id)).await,
        );
        assert_eq!(resumed[0].status, SubscriptionStatus::Active);

        let all = subscription_instances(
            manage(&server, COLLECTION_OPEN, tm11::Action::Status, None).await,
        );
        assert_eq!(all.len(), 1);

        let gone = subscription_instances(
            manage(&server, COLLECTION_OPEN, tm11::Action::Unsubscribe, Some(&id)).await,
        );
        assert_eq!(gone[0].status, SubscriptionStatus::Unsubscribed);
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_id_still_answers() {
        let server = fixture_server().await;
        let gone = subscription_instances(
            manage(&server, COLLECTION_OPEN, tm11::Action::Unsubscribe, Some("nope")).await,
        );
        assert_eq!(gone[0].subscription_id, "nope");
        assert_eq!(gone[0].status, SubscriptionStatus::Unsubscribed);
    }

    #[tokio::test]
    async fn test_pause_unknown_id_is_not_found() {
        let server = fixture_server().await;
        let reply = manage(&server, COLLECTION_OPEN, tm11::Action::Pause, Some("nope")).await;
        let tm11::Message::StatusMessage(status) = reply else {
            panic!("expected status");
        };
        assert_eq!(status.status_type, StatusType::NotFound);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_not_found() {
        let server = fixture_server().await;
        let reply = manage(&server, "missing", tm11::Action::Subscribe, None).await;
        let tm11::Message::StatusMessage(status) = reply else {
            panic!("expected status");
        };
        assert_eq!(status.status_type, StatusType::NotFound);
        assert_eq!(status.in_response_to, "7");
    }
}

//! Poll service: serves content blocks out of collections.

use async_trait::async_trait;
use chrono::Utc;
use taxii_core::{
    PollParameters, PollRequest, PollResponse, Request, RequestBody, Response, ResponseType,
    ServiceEntity, TaxiiError,
};
use tracing::debug;

use super::{RequestContext, TaxiiService};
use crate::data::{ContentBlockQuery, DataManager};
use crate::Result;

/// Answers poll requests for the collections assigned to it.
#[derive(Debug)]
pub struct PollService {
    definition: ServiceEntity,
    manager: DataManager,
}

impl PollService {
    /// Poll service over the collections `manager` assigns to `definition`.
    #[must_use]
    pub const fn new(definition: ServiceEntity, manager: DataManager) -> Self {
        Self {
            definition,
            manager,
        }
    }

    async fn poll(&self, request: PollRequest) -> Result<Response> {
        let collection = self
            .manager
            .get_collection(&request.collection_name, &self.definition.id)
            .await?
            .filter(|c| c.available)
            .ok_or_else(|| TaxiiError::not_found(&request.collection_name))?;

        let parameters = match &request.subscription_id {
            Some(subscription_id) => {
                let subscription = self
                    .manager
                    .get_subscription(subscription_id)
                    .await?
                    .filter(|s| Some(s.collection_id) == collection.id)
                    .ok_or_else(|| TaxiiError::not_found(subscription_id))?;
                if !subscription.is_active() {
                    return Err(TaxiiError::Failure(format!(
                        "subscription {subscription_id} is not active"
                    ))
                    .into());
                }
                request.parameters.unwrap_or_else(|| {
                    subscription
                        .params
                        .map(|p| PollParameters {
                            response_type: p.response_type,
                            content_bindings: p.content_bindings,
                        })
                        .unwrap_or_default()
                })
            }
            None => request.parameters.unwrap_or_default(),
        };

        let inclusive_end = request.inclusive_end.unwrap_or_else(Utc::now);
        let query = ContentBlockQuery {
            exclusive_begin: request.exclusive_begin,
            inclusive_end: Some(inclusive_end),
            bindings: parameters.content_bindings,
        };

        let (record_count, content_blocks) = match parameters.response_type {
            ResponseType::CountOnly => (
                self.manager.count_content_blocks(&collection, &query).await?,
                Vec::new(),
            ),
            ResponseType::Full => {
                let blocks = self.manager.get_content_blocks(&collection, &query).await?;
                (blocks.len() as u64, blocks)
            }
        };

        debug!(
            collection = %collection.name,
            records = record_count,
            "poll answered"
        );

        Ok(Response::Poll(PollResponse {
            collection_name: collection.name,
            exclusive_begin: request.exclusive_begin,
            inclusive_end,
            subscription_id: request.subscription_id,
            record_count,
            content_blocks,
            message: None,
        }))
    }
}

#[async_trait]
impl TaxiiService for PollService {
    fn definition(&self) -> &ServiceEntity {
        &self.definition
    }

    fn handles(&self, body: &RequestBody) -> bool {
        matches!(body, RequestBody::Poll(_))
    }

    async fn handle(&self, _ctx: &RequestContext, request: Request) -> Result<Response> {
        match request.body {
            RequestBody::Poll(poll) => self.poll(poll).await,
            other => Err(TaxiiError::UnsupportedMessage(other.name().to_string()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::http::Headers;
    use crate::test_support::{
        fixture_server, request_message, stix_block, COLLECTION_DISABLED, COLLECTION_OPEN,
    };
    use chrono::{DateTime, Duration, Utc};
    use taxii_core::constants::CB_STIX_XML_111;
    use taxii_core::{
        tm10, tm11, ContentBindingEntity, ContentBlockEntity, ResponseType, StatusType,
        VersionedMessage,
    };

    fn poll_request(
        collection: &str,
        begin: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        response_type: ResponseType,
    ) -> VersionedMessage {
        request_message(tm11::Message::PollRequest(tm11::PollRequest {
            message_id: "p-1".into(),
            collection_name: collection.into(),
            exclusive_begin_timestamp_label: begin,
            inclusive_end_timestamp_label: end,
            subscription_id: None,
            poll_parameters: Some(tm11::PollParameters {
                allow_asynch: false,
                response_type,
                content_bindings: Vec::new(),
            }),
        }))
    }

    async fn store(server: &crate::TaxiiServer, blocks: Vec<ContentBlockEntity>) {
        let manager = server.manager();
        let open = manager
            .get_collection(COLLECTION_OPEN, "poll-A")
            .await
            .unwrap()
            .unwrap();
        for block in blocks {
            manager
                .create_content(block, std::slice::from_ref(&open))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_empty_collection_is_success_without_blocks() {
        let server = fixture_server().await;
        let reply = server
            .get_service("poll-A")
            .unwrap()
            .process(
                &Headers::new(),
                poll_request(COLLECTION_OPEN, None, None, ResponseType::Full),
            )
            .await;
        let VersionedMessage::V11(tm11::Message::PollResponse(response)) = reply else {
            panic!("expected poll response");
        };
        assert!(response.content_blocks.is_empty());
        assert_eq!(response.record_count.map(|c| c.record_count), Some(0));
    }

    #[tokio::test]
    async fn test_window_selects_blocks_oldest_first() {
        let server = fixture_server().await;
        let now = Utc::now();
        store(
            &server,
            vec![
                stix_block("third").with_timestamp(now - Duration::minutes(1)),
                stix_block("first").with_timestamp(now - Duration::minutes(10)),
                stix_block("second").with_timestamp(now - Duration::minutes(5)),
            ],
        )
        .await;

        let reply = server
            .get_service("poll-A")
            .unwrap()
            .process(
                &Headers::new(),
                poll_request(
                    COLLECTION_OPEN,
                    Some(now - Duration::minutes(10)),
                    Some(now),
                    ResponseType::Full,
                ),
            )
            .await;
        let VersionedMessage::V11(tm11::Message::PollResponse(response)) = reply else {
            panic!("expected poll response");
        };
        let contents: Vec<&str> = response
            .content_blocks
            .iter()
            .map(|b| b.content.as_str())
            .collect();
        // The begin label is exclusive.
        assert_eq!(contents, vec!["second", "third"]);
        assert_eq!(response.inclusive_end_timestamp_label, now);
    }

    #[tokio::test]
    async fn test_count_only() {
        let server = fixture_server().await;
        store(&server, vec![stix_block("a"), stix_block("b")]).await;

        let reply = server
            .get_service("poll-A")
            .unwrap()
            .process(
                &Headers::new(),
                poll_request(COLLECTION_OPEN, None, None, ResponseType::CountOnly),
            )
            .await;
        let VersionedMessage::V11(tm11::Message::PollResponse(response)) = reply else {
            panic!("expected poll response");
        };
        assert!(response.content_blocks.is_empty());
        assert_eq!(response.record_count.map(|c| c.record_count), Some(2));
    }

    #[tokio::test]
    async fn test_binding_filter_in_10() {
        let server = fixture_server().await;
        store(
            &server,
            vec![
                stix_block("stix"),
                ContentBlockEntity::new("custom", ContentBindingEntity::new("urn:custom")),
            ],
        )
        .await;

        let reply = server
            .get_service("poll-A")
            .unwrap()
            .process(
                &Headers::new(),
                VersionedMessage::V10(tm10::Message::PollRequest(tm10::PollRequest {
                    message_id: "p-2".into(),
                    feed_name: COLLECTION_OPEN.into(),
                    exclusive_begin_timestamp_label: None,
                    inclusive_end_timestamp_label: None,
                    subscription_id: None,
                    content_bindings: vec![CB_STIX_XML_111.into()],
                })),
            )
            .await;
        let VersionedMessage::V10(tm10::Message::PollResponse(response)) = reply else {
            panic!("expected poll response");
        };
        assert_eq!(response.content_blocks.len(), 1);
        assert_eq!(response.content_blocks[0].content, "stix");
    }

    #[tokio::test]
    async fn test_disabled_collection_is_not_found() {
        let server = fixture_server().await;
        let reply = server
            .get_service("poll-A")
            .unwrap()
            .process(
                &Headers::new(),
                poll_request(COLLECTION_DISABLED, None, None, ResponseType::Full),
            )
            .await;
        let VersionedMessage::V11(tm11::Message::StatusMessage(status)) = reply else {
            panic!("expected status");
        };
        assert_eq!(status.status_type, StatusType::NotFound);
    }

    #[tokio::test]
    async fn test_paused_subscription_cannot_poll() {
        let server = fixture_server().await;
        let manager = server.manager();
        let open = manager
            .get_collection(COLLECTION_OPEN, "poll-A")
            .await
            .unwrap()
            .unwrap();
        let mut subscription = manager.create_subscription(&open, None, None).await.unwrap();
        subscription.status = taxii_core::SubscriptionStatus::Paused;
        manager.update_subscription(subscription.clone()).await.unwrap();

        let reply = server
            .get_service("poll-A")
            .unwrap()
            .process(
                &Headers::new(),
                request_message(tm11::Message::PollRequest(tm11::PollRequest {
                    message_id: "p-3".into(),
                    collection_name: COLLECTION_OPEN.into(),
                    exclusive_begin_timestamp_label: None,
                    inclusive_end_timestamp_label: None,
                    subscription_id: Some(subscription.subscription_id),
                    poll_parameters: None,
                })),
            )
            .await;
        let VersionedMessage::V11(tm11::Message::StatusMessage(status)) = reply else {
            panic!("expected status");
        };
        assert_eq!(status.status_type, StatusType::Failure);
    }
}

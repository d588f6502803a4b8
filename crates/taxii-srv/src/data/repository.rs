//! Persistence boundary consumed by the data manager.
//!
//! Implementations own their concurrency control: every method is one atomic
//! operation from the caller's point of view.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use taxii_core::{CollectionEntity, ContentBindingEntity, ContentBlockEntity, SubscriptionEntity};

use crate::{Result, SrvError};

/// Filter applied when reading content blocks of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentBlockQuery {
    /// Only blocks strictly newer than this.
    pub exclusive_begin: Option<DateTime<Utc>>,
    /// Only blocks not newer than this.
    pub inclusive_end: Option<DateTime<Utc>>,
    /// Only blocks matching one of these bindings, empty means any.
    pub bindings: Vec<ContentBindingEntity>,
}

impl ContentBlockQuery {
    /// Returns true if the block passes the filter.
    #[must_use]
    pub fn matches(&self, block: &ContentBlockEntity) -> bool {
        if self
            .exclusive_begin
            .is_some_and(|begin| block.timestamp_label <= begin)
        {
            return false;
        }
        if self
            .inclusive_end
            .is_some_and(|end| block.timestamp_label > end)
        {
            return false;
        }
        self.bindings.is_empty() || block.content_binding.is_supported_by(&self.bindings)
    }
}

/// Storage backend for collections, content, assignments and subscriptions.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Insert a collection, or replace the one with the same id or name.
    async fn save_collection(&self, collection: CollectionEntity) -> Result<CollectionEntity>;

    /// Collection by unique name.
    async fn get_collection(&self, name: &str) -> Result<Option<CollectionEntity>>;

    /// Collections assigned to a service, ordered by id, without duplicates.
    async fn get_collections(&self, service_id: &str) -> Result<Vec<CollectionEntity>>;

    /// Record `(service_id, collection_id)` pairs; existing pairs are kept as is.
    async fn assign_collection(&self, collection_id: u64, service_ids: &[String]) -> Result<()>;

    /// Returns true if the pair is recorded.
    async fn is_assigned(&self, collection_id: u64, service_id: &str) -> Result<bool>;

    /// Service ids assigned to a collection.
    async fn get_service_ids(&self, collection_id: u64) -> Result<Vec<String>>;

    /// Store each block once and link it to its listed collections.
    ///
    /// The whole batch is stored or nothing is.
    async fn create_content_blocks(
        &self,
        batch: Vec<(ContentBlockEntity, Vec<u64>)>,
    ) -> Result<Vec<ContentBlockEntity>>;

    /// Store a single block; see [`Repository::create_content_blocks`].
    async fn create_content_block(
        &self,
        block: ContentBlockEntity,
        collection_ids: &[u64],
    ) -> Result<ContentBlockEntity> {
        self.create_content_blocks(vec![(block, collection_ids.to_vec())])
            .await?
            .pop()
            .ok_or_else(|| SrvError::Storage("content block was not stored".into()))
    }

    /// Blocks linked to a collection, oldest first.
    async fn get_content_blocks(
        &self,
        collection_id: u64,
        query: &ContentBlockQuery,
    ) -> Result<Vec<ContentBlockEntity>>;

    /// Live count of blocks linked to a collection.
    async fn count_content_blocks(&self, collection_id: u64, query: &ContentBlockQuery)
        -> Result<u64>;

    /// Store a new subscription.
    async fn create_subscription(
        &self,
        subscription: SubscriptionEntity,
    ) -> Result<SubscriptionEntity>;

    /// Subscription by id.
    async fn get_subscription(&self, subscription_id: &str) -> Result<Option<SubscriptionEntity>>;

    /// Subscriptions of a collection, oldest first.
    async fn get_subscriptions(&self, collection_id: u64) -> Result<Vec<SubscriptionEntity>>;

    /// Replace a stored subscription.
    async fn update_subscription(
        &self,
        subscription: SubscriptionEntity,
    ) -> Result<SubscriptionEntity>;
}

//! Data manager: the single persistence-facing component the services use.

mod memory;
mod repository;

pub use memory::MemoryRepository;
pub use repository::{ContentBlockQuery, Repository};

use chrono::Utc;
use std::sync::Arc;
use taxii_core::{
    CollectionEntity, ContentBlockEntity, PushParameters, ServiceEntity, ServiceType,
    SubscriptionEntity, SubscriptionParameters, SubscriptionStatus, TaxiiError,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::CollectionConfig;
use crate::{Result, SrvError};

/// Handle over the repository and the service topology.
///
/// Cloning is cheap; clones share the same repository.
#[derive(Clone)]
pub struct DataManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    repository: Arc<dyn Repository>,
    services: Vec<ServiceEntity>,
}

impl std::fmt::Debug for DataManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataManager")
            .field("services", &self.inner.services.len())
            .finish_non_exhaustive()
    }
}

impl DataManager {
    /// Create a manager over `repository` for the given services.
    #[must_use]
    pub fn new(services: Vec<ServiceEntity>, repository: Arc<dyn Repository>) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                repository,
                services,
            }),
        }
    }

    /// Configured services in configuration order.
    #[must_use]
    pub fn services(&self) -> &[ServiceEntity] {
        &self.inner.services
    }

    /// Configured service by id.
    #[must_use]
    pub fn service(&self, service_id: &str) -> Option<&ServiceEntity> {
        self.inner.services.iter().find(|s| s.id == service_id)
    }

    fn repository(&self) -> &dyn Repository {
        self.inner.repository.as_ref()
    }

    /// Collection by name, if it exists and is assigned to the service.
    pub async fn get_collection(
        &self,
        name: &str,
        service_id: &str,
    ) -> Result<Option<CollectionEntity>> {
        let Some(collection) = self.repository().get_collection(name).await? else {
            return Ok(None);
        };
        let id = stored_id(&collection)?;
        if self.repository().is_assigned(id, service_id).await? {
            Ok(Some(collection))
        } else {
            Ok(None)
        }
    }

    /// All collections assigned to the service.
    pub async fn get_collections(&self, service_id: &str) -> Result<Vec<CollectionEntity>> {
        self.repository().get_collections(service_id).await
    }

    /// Live number of blocks in a collection exposed by the service.
    pub async fn get_collection_volume(
        &self,
        collection: &CollectionEntity,
        service_id: &str,
    ) -> Result<u64> {
        let id = stored_id(collection)?;
        if !self.repository().is_assigned(id, service_id).await? {
            return Err(TaxiiError::not_found(&collection.name).into());
        }
        self.repository()
            .count_content_blocks(id, &ContentBlockQuery::default())
            .await
    }

    /// Persist a block once and link it to every listed collection.
    ///
    /// Every collection must accept the block's binding, otherwise nothing
    /// is stored.
    pub async fn create_content(
        &self,
        block: ContentBlockEntity,
        collections: &[CollectionEntity],
    ) -> Result<ContentBlockEntity> {
        let ids = link_targets(&block, collections)?;
        let stored = self.repository().create_content_block(block, &ids).await?;
        debug!(
            block = ?stored.id,
            binding = %stored.content_binding,
            collections = ids.len(),
            "stored content block"
        );
        Ok(stored)
    }

    /// Persist several blocks, each linked to its own collections.
    ///
    /// Either every block is stored or none is.
    pub async fn create_contents(
        &self,
        batch: Vec<(ContentBlockEntity, Vec<CollectionEntity>)>,
    ) -> Result<Vec<ContentBlockEntity>> {
        let mut linked = Vec::with_capacity(batch.len());
        for (block, collections) in batch {
            let ids = link_targets(&block, &collections)?;
            linked.push((block, ids));
        }
        if linked.is_empty() {
            return Ok(Vec::new());
        }

        let stored = self.repository().create_content_blocks(linked).await?;
        debug!(blocks = stored.len(), "stored content blocks");
        Ok(stored)
    }

    /// Blocks of a collection matching the query, oldest first.
    pub async fn get_content_blocks(
        &self,
        collection: &CollectionEntity,
        query: &ContentBlockQuery,
    ) -> Result<Vec<ContentBlockEntity>> {
        let id = stored_id(collection)?;
        self.repository().get_content_blocks(id, query).await
    }

    /// Number of blocks of a collection matching the query.
    pub async fn count_content_blocks(
        &self,
        collection: &CollectionEntity,
        query: &ContentBlockQuery,
    ) -> Result<u64> {
        let id = stored_id(collection)?;
        self.repository().count_content_blocks(id, query).await
    }

    /// Insert or update a collection.
    pub async fn save_collection(&self, collection: CollectionEntity) -> Result<CollectionEntity> {
        self.repository().save_collection(collection).await
    }

    /// Assign a collection to services; repeated pairs are ignored.
    pub async fn assign_collection(&self, collection_id: u64, service_ids: &[String]) -> Result<()> {
        self.repository()
            .assign_collection(collection_id, service_ids)
            .await
    }

    /// Configured services of a type the collection is assigned to.
    pub async fn get_services_for_collection(
        &self,
        collection: &CollectionEntity,
        service_type: ServiceType,
    ) -> Result<Vec<ServiceEntity>> {
        let id = stored_id(collection)?;
        let assigned = self.repository().get_service_ids(id).await?;
        Ok(self
            .inner
            .services
            .iter()
            .filter(|s| s.service_type == service_type && assigned.contains(&s.id))
            .cloned()
            .collect())
    }

    /// Create an active subscription to a collection.
    pub async fn create_subscription(
        &self,
        collection: &CollectionEntity,
        params: Option<SubscriptionParameters>,
        push_parameters: Option<PushParameters>,
    ) -> Result<SubscriptionEntity> {
        let subscription = SubscriptionEntity {
            subscription_id: Uuid::new_v4().to_string(),
            collection_id: stored_id(collection)?,
            status: SubscriptionStatus::Active,
            params,
            push_parameters,
            created: Utc::now(),
        };
        let stored = self.repository().create_subscription(subscription).await?;
        info!(
            subscription = %stored.subscription_id,
            collection = %collection.name,
            "subscription created"
        );
        Ok(stored)
    }

    /// Subscription by id.
    pub async fn get_subscription(&self, subscription_id: &str) -> Result<Option<SubscriptionEntity>> {
        self.repository().get_subscription(subscription_id).await
    }

    /// Subscriptions of a collection.
    pub async fn get_subscriptions(
        &self,
        collection: &CollectionEntity,
    ) -> Result<Vec<SubscriptionEntity>> {
        let id = stored_id(collection)?;
        self.repository().get_subscriptions(id).await
    }

    /// Replace a stored subscription.
    pub async fn update_subscription(
        &self,
        subscription: SubscriptionEntity,
    ) -> Result<SubscriptionEntity> {
        debug!(
            subscription = %subscription.subscription_id,
            status = ?subscription.status,
            "subscription updated"
        );
        self.repository().update_subscription(subscription).await
    }

    /// Create the configured collections and their service assignments.
    pub async fn provision(&self, collections: &[CollectionConfig]) -> Result<Vec<CollectionEntity>> {
        let mut provisioned = Vec::with_capacity(collections.len());
        for config in collections {
            if let Some(unknown) = config
                .service_ids
                .iter()
                .find(|id| self.service(id).is_none())
            {
                return Err(SrvError::Config(format!(
                    "collection '{}' is assigned to unknown service '{unknown}'",
                    config.name
                )));
            }

            let collection = self.save_collection(config.to_entity()).await?;
            self.assign_collection(stored_id(&collection)?, &config.service_ids)
                .await?;
            provisioned.push(collection);
        }

        info!(collections = provisioned.len(), "collections provisioned");
        Ok(provisioned)
    }
}

/// Storage ids of the collections a block goes to, checking each accepts it.
fn link_targets(block: &ContentBlockEntity, collections: &[CollectionEntity]) -> Result<Vec<u64>> {
    let mut ids = Vec::with_capacity(collections.len());
    for collection in collections {
        if !collection.accepts(&block.content_binding) {
            return Err(TaxiiError::ContentBindingMismatch {
                collection: collection.name.clone(),
                binding: block.content_binding.to_string(),
                supported: collection
                    .supported_content
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            }
            .into());
        }
        let id = stored_id(collection)?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn stored_id(collection: &CollectionEntity) -> Result<u64> {
    collection.id.ok_or_else(|| {
        SrvError::Storage(format!(
            "collection '{}' has not been persisted",
            collection.name
        ))
    })
}

//! In-memory repository with optional JSON snapshots.
//!
//! All state sits behind one `RwLock`, so each trait method is atomic with
//! respect to every other. Snapshots are plain serde_json dumps of that state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::debug;

use taxii_core::{CollectionEntity, ContentBlockEntity, SubscriptionEntity};

use super::repository::{ContentBlockQuery, Repository};
use crate::SrvError;

/// Everything the repository stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct State {
    #[serde(default)]
    next_collection_id: u64,
    #[serde(default)]
    next_block_id: u64,
    #[serde(default)]
    collections: BTreeMap<u64, CollectionEntity>,
    #[serde(default)]
    content_blocks: BTreeMap<u64, ContentBlockEntity>,
    /// `(collection_id, block_id)` links.
    #[serde(default)]
    collection_content: BTreeSet<(u64, u64)>,
    /// `(service_id, collection_id)` assignments.
    #[serde(default)]
    assignments: BTreeSet<(String, u64)>,
    #[serde(default)]
    subscriptions: BTreeMap<String, SubscriptionEntity>,
}

impl State {
    fn allocate_collection_id(&mut self) -> u64 {
        self.next_collection_id += 1;
        self.next_collection_id
    }

    fn allocate_block_id(&mut self) -> u64 {
        self.next_block_id += 1;
        self.next_block_id
    }

    fn collection_id_by_name(&self, name: &str) -> Option<u64> {
        self.collections
            .iter()
            .find(|(_, c)| c.name == name)
            .map(|(id, _)| *id)
    }

    fn linked_blocks(&self, collection_id: u64) -> impl Iterator<Item = &ContentBlockEntity> + '_ {
        self.collection_content
            .range((collection_id, 0)..=(collection_id, u64::MAX))
            .filter_map(|(_, block_id)| self.content_blocks.get(block_id))
    }
}

/// Repository keeping all state in process memory.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: RwLock<State>,
}

impl MemoryRepository {
    /// Empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository restored from a snapshot file.
    ///
    /// A missing file yields an empty repository.
    pub fn open(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| SrvError::State(format!("failed to read {}: {e}", path.display())))?;
        let state: State = serde_json::from_str(&content)
            .map_err(|e| SrvError::State(format!("failed to parse state: {e}")))?;

        debug!(
            path = %path.display(),
            collections = state.collections.len(),
            blocks = state.content_blocks.len(),
            "restored repository snapshot"
        );

        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Write the current state to a snapshot file.
    pub async fn save(&self, path: &Path) -> crate::Result<()> {
        let json = {
            let state = self.state.read().await;
            serde_json::to_string_pretty(&*state)?
        };
        std::fs::write(path, json)
            .map_err(|e| SrvError::State(format!("failed to write {}: {e}", path.display())))?;
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn save_collection(&self, mut collection: CollectionEntity) -> crate::Result<CollectionEntity> {
        let mut state = self.state.write().await;

        let by_name = state.collection_id_by_name(&collection.name);
        let id = match (collection.id, by_name) {
            (Some(id), Some(other)) if id != other => {
                return Err(SrvError::Storage(format!(
                    "collection name '{}' is already in use",
                    collection.name
                )));
            }
            (Some(id), _) => {
                state.next_collection_id = state.next_collection_id.max(id);
                id
            }
            (None, Some(existing)) => existing,
            (None, None) => state.allocate_collection_id(),
        };

        collection.id = Some(id);
        state.collections.insert(id, collection.clone());
        Ok(collection)
    }

    async fn get_collection(&self, name: &str) -> crate::Result<Option<CollectionEntity>> {
        let state = self.state.read().await;
        Ok(state.collections.values().find(|c| c.name == name).cloned())
    }

    async fn get_collections(&self, service_id: &str) -> crate::Result<Vec<CollectionEntity>> {
        let state = self.state.read().await;
        let ids: BTreeSet<u64> = state
            .assignments
            .iter()
            .filter(|(sid, _)| sid == service_id)
            .map(|(_, cid)| *cid)
            .collect();
        Ok(ids
            .iter()
            .filter_map(|id| state.collections.get(id).cloned())
            .collect())
    }

    async fn assign_collection(&self, collection_id: u64, service_ids: &[String]) -> crate::Result<()> {
        let mut state = self.state.write().await;
        if !state.collections.contains_key(&collection_id) {
            return Err(SrvError::Storage(format!(
                "collection {collection_id} does not exist"
            )));
        }
        for service_id in service_ids {
            state.assignments.insert((service_id.clone(), collection_id));
        }
        Ok(())
    }

    async fn is_assigned(&self, collection_id: u64, service_id: &str) -> crate::Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .contains(&(service_id.to_string(), collection_id)))
    }

    async fn get_service_ids(&self, collection_id: u64) -> crate::Result<Vec<String>> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .iter()
            .filter(|(_, cid)| *cid == collection_id)
            .map(|(sid, _)| sid.clone())
            .collect())
    }

    async fn create_content_blocks(
        &self,
        batch: Vec<(ContentBlockEntity, Vec<u64>)>,
    ) -> crate::Result<Vec<ContentBlockEntity>> {
        let mut state = self.state.write().await;

        // Validate every target before touching anything.
        if let Some(missing) = batch
            .iter()
            .flat_map(|(_, ids)| ids)
            .find(|id| !state.collections.contains_key(*id))
        {
            return Err(SrvError::Storage(format!(
                "collection {missing} does not exist"
            )));
        }

        let mut stored = Vec::with_capacity(batch.len());
        for (mut block, collection_ids) in batch {
            let id = state.allocate_block_id();
            block.id = Some(id);
            state.content_blocks.insert(id, block.clone());
            for collection_id in collection_ids {
                state.collection_content.insert((collection_id, id));
            }
            stored.push(block);
        }
        Ok(stored)
    }

    async fn get_content_blocks(
        &self,
        collection_id: u64,
        query: &ContentBlockQuery,
    ) -> crate::Result<Vec<ContentBlockEntity>> {
        let state = self.state.read().await;
        let mut blocks: Vec<ContentBlockEntity> = state
            .linked_blocks(collection_id)
            .filter(|b| query.matches(b))
            .cloned()
            .collect();
        blocks.sort_by(|a, b| a.timestamp_label.cmp(&b.timestamp_label).then(a.id.cmp(&b.id)));
        Ok(blocks)
    }

    async fn count_content_blocks(
        &self,
        collection_id: u64,
        query: &ContentBlockQuery,
    ) -> crate::Result<u64> {
        let state = self.state.read().await;
        let count = state
            .linked_blocks(collection_id)
            .filter(|b| query.matches(b))
            .count();
        Ok(count as u64)
    }

    async fn create_subscription(
        &self,
        subscription: SubscriptionEntity,
    ) -> crate::Result<SubscriptionEntity> {
        let mut state = self.state.write().await;
        if !state.collections.contains_key(&subscription.collection_id) {
            return Err(SrvError::Storage(format!(
                "collection {} does not exist",
                subscription.collection_id
            )));
        }
        if state.subscriptions.contains_key(&subscription.subscription_id) {
            return Err(SrvError::Storage(format!(
                "subscription '{}' already exists",
                subscription.subscription_id
            )));
        }
        state
            .subscriptions
            .insert(subscription.subscription_id.clone(), subscription.clone());
        Ok(subscription)
    }

    async fn get_subscription(&self, subscription_id: &str) -> crate::Result<Option<SubscriptionEntity>> {
        Ok(self
            .state
            .read()
            .await
            .subscriptions
            .get(subscription_id)
            .cloned())
    }

    async fn get_subscriptions(&self, collection_id: u64) -> crate::Result<Vec<SubscriptionEntity>> {
        let state = self.state.read().await;
        let mut subscriptions: Vec<SubscriptionEntity> = state
            .subscriptions
            .values()
            .filter(|s| s.collection_id == collection_id)
            .cloned()
            .collect();
        subscriptions.sort_by(|a, b| a.created.cmp(&b.created));
        Ok(subscriptions)
    }

    async fn update_subscription(
        &self,
        subscription: SubscriptionEntity,
    ) -> crate::Result<SubscriptionEntity> {
        let mut state = self.state.write().await;
        match state.subscriptions.get_mut(&subscription.subscription_id) {
            Some(stored) => {
                *stored = subscription.clone();
                Ok(subscription)
            }
            None => Err(SrvError::Storage(format!(
                "subscription '{}' does not exist",
                subscription.subscription_id
            ))),
        }
    }
}

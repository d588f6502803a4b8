//! Inbox service: accepts pushed content and routes it into collections.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use taxii_core::{
    CollectionEntity, ContentBindingEntity, ContentBlockEntity, InboxRequest, ProtocolVersion,
    Request, RequestBody, Response, ServiceEntity, TaxiiError,
};
use tracing::{debug, info, warn};

use super::{success, RequestContext, TaxiiService};
use crate::data::DataManager;
use crate::Result;

/// What happens when a named destination collection rejects a block's binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MismatchPolicy {
    /// Leave the rejecting collection out and carry on.
    Skip,
    /// Store into the accepting collections, then report the rejections.
    Reject,
    /// Store nothing and report the rejections.
    Abort,
}

impl MismatchPolicy {
    /// Policy used when none is configured.
    #[must_use]
    pub const fn default_for(version: ProtocolVersion) -> Self {
        match version {
            ProtocolVersion::V10 => Self::Skip,
            ProtocolVersion::V11 => Self::Reject,
        }
    }
}

/// Inbox behaviour knobs.
#[derive(Debug, Clone, Default)]
pub struct InboxSettings {
    /// Accept blocks of any binding.
    pub accept_all_content: bool,
    /// Accepted bindings when not accepting everything.
    pub supported_content: Vec<ContentBindingEntity>,
    /// 1.1 requests must name their destinations.
    pub destination_collection_required: bool,
    /// Explicit mismatch policy, else [`MismatchPolicy::default_for`].
    pub mismatch_policy: Option<MismatchPolicy>,
}

impl InboxSettings {
    /// Content the inbox advertises (empty when any is accepted).
    #[must_use]
    pub fn advertised_content(&self) -> &[ContentBindingEntity] {
        if self.accept_all_content {
            &[]
        } else {
            &self.supported_content
        }
    }

    /// Returns true if blocks with this binding are let in.
    #[must_use]
    pub fn accepts(&self, binding: &ContentBindingEntity) -> bool {
        self.accept_all_content
            || self.supported_content.is_empty()
            || binding.is_supported_by(&self.supported_content)
    }
}

/// Destinations of one block after binding checks.
struct Routing {
    block: ContentBlockEntity,
    targets: Vec<CollectionEntity>,
    rejected_by: Vec<String>,
}

/// Accepts inbox messages for the collections assigned to it.
#[derive(Debug)]
pub struct InboxService {
    definition: ServiceEntity,
    manager: DataManager,
    settings: InboxSettings,
}

impl InboxService {
    /// Inbox over the collections `manager` assigns to `definition`.
    #[must_use]
    pub const fn new(definition: ServiceEntity, manager: DataManager, settings: InboxSettings) -> Self {
        Self {
            definition,
            manager,
            settings,
        }
    }

    async fn available_collections(&self) -> Result<Vec<CollectionEntity>> {
        Ok(self
            .manager
            .get_collections(&self.definition.id)
            .await?
            .into_iter()
            .filter(|c| c.available)
            .collect())
    }

    /// Named destinations, or every available collection when none are named.
    async fn destinations(
        &self,
        version: ProtocolVersion,
        names: &[String],
    ) -> Result<Vec<CollectionEntity>> {
        let available = self.available_collections().await?;
        let acceptable = || available.iter().map(|c| c.name.clone()).collect::<Vec<_>>();

        if names.is_empty() {
            if self.settings.destination_collection_required && version == ProtocolVersion::V11 {
                return Err(TaxiiError::DestinationCollection {
                    message: "destination collection names are required".into(),
                    acceptable: acceptable(),
                }
                .into());
            }
            return Ok(available);
        }

        let mut named = Vec::with_capacity(names.len());
        let mut unknown = Vec::new();
        for name in names {
            match available.iter().find(|c| &c.name == name) {
                Some(collection) => {
                    if !named.iter().any(|c: &CollectionEntity| c.id == collection.id) {
                        named.push(collection.clone());
                    }
                }
                None => unknown.push(name.as_str()),
            }
        }
        if !unknown.is_empty() {
            return Err(TaxiiError::DestinationCollection {
                message: format!(
                    "unknown or unavailable destination collections: {}",
                    unknown.join(", ")
                ),
                acceptable: acceptable(),
            }
            .into());
        }
        Ok(named)
    }

    async fn inbox(&self, version: ProtocolVersion, request: InboxRequest) -> Result<Response> {
        let named = !request.destination_collection_names.is_empty();
        let destinations = self
            .destinations(version, &request.destination_collection_names)
            .await?;
        let policy = self
            .settings
            .mismatch_policy
            .unwrap_or_else(|| MismatchPolicy::default_for(version));

        if let Some(subscription_id) = &request.subscription_id {
            debug!(subscription = %subscription_id, "inbox message delivered for subscription");
        }

        // Plan every block before storing anything, so abort can refuse the
        // whole message.
        let mut unsupported = Vec::new();
        let mut plan = Vec::with_capacity(request.content_blocks.len());
        for block in request.content_blocks {
            if !self.settings.accepts(&block.content_binding) {
                warn!(
                    service = %self.definition.id,
                    binding = %block.content_binding,
                    "content binding not supported by inbox, block skipped"
                );
                unsupported.push(block.content_binding.to_string());
                continue;
            }
            let (targets, rejecting): (Vec<_>, Vec<_>) = destinations
                .iter()
                .cloned()
                .partition(|c| c.accepts(&block.content_binding));
            plan.push(Routing {
                block,
                targets,
                rejected_by: rejecting.into_iter().map(|c| c.name).collect(),
            });
        }

        let mut rejected: Vec<String> = Vec::new();
        for routing in &plan {
            if routing.rejected_by.is_empty() {
                continue;
            }
            if named && policy != MismatchPolicy::Skip {
                for name in &routing.rejected_by {
                    if !rejected.contains(name) {
                        rejected.push(name.clone());
                    }
                }
            } else {
                debug!(
                    binding = %routing.block.content_binding,
                    collections = %routing.rejected_by.join(", "),
                    "collections skipped for unsupported binding"
                );
            }
        }

        if !rejected.is_empty() && policy == MismatchPolicy::Abort {
            return Err(rejection(&rejected, &destinations).into());
        }

        // Blocks are labelled with the time they were accepted, so incremental
        // polls from a previous end label never miss them.
        let accepted_at = Utc::now();
        let mut unrouted = 0usize;
        let mut batch = Vec::with_capacity(plan.len());
        for routing in plan {
            if routing.targets.is_empty() {
                unrouted += 1;
                continue;
            }
            batch.push((routing.block.with_timestamp(accepted_at), routing.targets));
        }
        let stored = self.manager.create_contents(batch).await?.len();

        info!(
            service = %self.definition.id,
            stored,
            skipped = unsupported.len(),
            unrouted,
            "inbox message processed"
        );

        if !rejected.is_empty() {
            return Err(rejection(&rejected, &destinations).into());
        }

        let mut message = format!("{stored} content block(s) stored");
        if unrouted > 0 {
            message.push_str(&format!("; {unrouted} block(s) matched no collection"));
        }
        if !unsupported.is_empty() {
            message.push_str(&format!(
                "; {} block(s) skipped, unsupported content binding: {}",
                unsupported.len(),
                unsupported.join(", ")
            ));
        }
        Ok(success(message))
    }
}

fn rejection(rejected: &[String], destinations: &[CollectionEntity]) -> TaxiiError {
    TaxiiError::DestinationCollection {
        message: format!(
            "content binding not supported by destination collections: {}",
            rejected.join(", ")
        ),
        acceptable: destinations
            .iter()
            .filter(|c| !rejected.contains(&c.name))
            .map(|c| c.name.clone())
            .collect(),
    }
}

#[async_trait]
impl TaxiiService for InboxService {
    fn definition(&self) -> &ServiceEntity {
        &self.definition
    }

    fn handles(&self, body: &RequestBody) -> bool {
        matches!(body, RequestBody::Inbox(_))
    }

    async fn handle(&self, ctx: &RequestContext, request: Request) -> Result<Response> {
        match request.body {
            RequestBody::Inbox(inbox) => self.inbox(ctx.version, inbox).await,
            other => Err(TaxiiError::UnsupportedMessage(other.name().to_string()).into()),
        }
    }
}

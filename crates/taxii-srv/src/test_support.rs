//! Shared fixtures: a five-service topology with four collections.

use std::sync::Arc;
use taxii_core::constants::{
    CB_STIX_XML_111, HTTP_X_TAXII_CONTENT_TYPE, HTTP_X_TAXII_PROTOCOL, HTTP_X_TAXII_SERVICES,
    VID_TAXII_HTTP_10,
};
use taxii_core::{
    tm11, CollectionType, ContentBindingEntity, ContentBlockEntity, ProtocolVersion, ServiceType,
    VersionedMessage,
};

use crate::config::{CollectionConfig, ServerConfig, ServiceConfig};
use crate::data::{DataManager, MemoryRepository};
use crate::http::{protocol_binding, Headers};
use crate::TaxiiServer;

pub const COLLECTION_OPEN: &str = "collection-open";
pub const COLLECTION_ONLY_STIX: &str = "collection-only-stix";
pub const COLLECTION_STIX_AND_CUSTOM: &str = "collection-stix-and-custom";
pub const COLLECTION_DISABLED: &str = "collection-disabled";

pub const CUSTOM_BINDING: &str = "urn:custom.example.com:json:0.0.1";

const CM: &str = "collection-management-A";

fn stix() -> ContentBindingEntity {
    ContentBindingEntity::new(CB_STIX_XML_111)
}

fn collection(name: &str, services: &[&str]) -> CollectionConfig {
    CollectionConfig {
        name: name.into(),
        description: Some(format!("{name} description")),
        collection_type: CollectionType::Feed,
        available: true,
        accept_all_content: false,
        supported_content: Vec::new(),
        service_ids: services.iter().map(|s| (*s).to_string()).collect(),
    }
}

pub fn fixture_config() -> ServerConfig {
    let mut discovery =
        ServiceConfig::new("discovery-A", ServiceType::Discovery, "/services/discovery-a");
    discovery.description = Some("discovery-A description".into());
    discovery.advertised_services = [
        "discovery-A",
        CM,
        "inbox-A",
        "inbox-B",
        "poll-A",
    ]
    .map(String::from)
    .to_vec();

    let management = ServiceConfig::new(
        CM,
        ServiceType::CollectionManagement,
        "/services/collection-management-a",
    );

    let mut inbox_a = ServiceConfig::new("inbox-A", ServiceType::Inbox, "/services/inbox-a");
    inbox_a.protocol_bindings = vec![VID_TAXII_HTTP_10.into()];
    inbox_a.accept_all_content = true;

    let mut inbox_b = ServiceConfig::new("inbox-B", ServiceType::Inbox, "/services/inbox-b");
    inbox_b.supported_content = vec![stix()];
    inbox_b.destination_collection_required = true;

    let poll = ServiceConfig::new("poll-A", ServiceType::Poll, "/services/poll-a");

    let mut open = collection(COLLECTION_OPEN, &[CM, "inbox-A", "inbox-B", "poll-A"]);
    open.collection_type = CollectionType::Set;
    open.accept_all_content = true;

    let mut only_stix = collection(COLLECTION_ONLY_STIX, &[CM, "inbox-A", "poll-A"]);
    only_stix.supported_content = vec![stix()];

    let mut stix_and_custom = collection(
        COLLECTION_STIX_AND_CUSTOM,
        &[CM, "inbox-A", "inbox-B", "poll-A"],
    );
    stix_and_custom.supported_content = vec![stix(), ContentBindingEntity::new(CUSTOM_BINDING)];

    let mut disabled = collection(COLLECTION_DISABLED, &[CM, "inbox-A", "poll-A"]);
    disabled.available = false;
    disabled.accept_all_content = true;

    ServerConfig {
        domain: "localhost:9000".into(),
        state_path: None,
        services: vec![discovery, management, inbox_a, inbox_b, poll],
        collections: vec![open, only_stix, stix_and_custom, disabled],
    }
}

pub async fn fixture_server() -> TaxiiServer {
    TaxiiServer::from_config(&fixture_config(), Arc::new(MemoryRepository::new()))
        .await
        .unwrap()
}

pub async fn fixture_manager() -> DataManager {
    let config = fixture_config();
    let manager = DataManager::new(
        config.service_entities(),
        Arc::new(MemoryRepository::new()),
    );
    manager.provision(&config.collections).await.unwrap();
    manager
}

pub fn request_message(message: tm11::Message) -> VersionedMessage {
    VersionedMessage::V11(message)
}

pub fn stix_block(content: &str) -> ContentBlockEntity {
    ContentBlockEntity::new(content, stix())
}

/// Request headers a well-behaved client sends for `version`.
pub fn headers_for(version: ProtocolVersion, https: bool) -> Headers {
    let mut headers = Headers::new();
    headers.insert(HTTP_X_TAXII_CONTENT_TYPE, version.message_binding());
    headers.insert(HTTP_X_TAXII_SERVICES, version.services_binding());
    headers.insert(HTTP_X_TAXII_PROTOCOL, protocol_binding(https));
    headers
}

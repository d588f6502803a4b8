//! Server configuration: domain, service topology and collections.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use taxii_core::constants::{
    SUPPORTED_MESSAGE_BINDINGS, SUPPORTED_PROTOCOL_BINDINGS, VID_TAXII_HTTPS_10,
    VID_TAXII_HTTP_10, VID_TAXII_XML_10, VID_TAXII_XML_11,
};
use taxii_core::{CollectionEntity, CollectionType, ContentBindingEntity, ServiceEntity, ServiceType};

use crate::http::normalize_path;
use crate::services::inbox::{InboxSettings, MismatchPolicy};

/// Configuration for a TAXII server instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host (and optional port) prepended to service paths in advertised addresses.
    #[serde(default = "default_domain")]
    pub domain: String,

    /// JSON snapshot of the in-memory repository (loaded at startup if present).
    #[serde(default)]
    pub state_path: Option<PathBuf>,

    /// Configured services, in advertisement order.
    #[serde(default)]
    pub services: Vec<ServiceConfig>,

    /// Collections created at startup and their service assignments.
    #[serde(default)]
    pub collections: Vec<CollectionConfig>,
}

/// One service of the topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Stable service id.
    pub id: String,

    /// Service kind.
    #[serde(rename = "type")]
    pub service_type: ServiceType,

    /// Path the service is served under (e.g. `/services/inbox-a`).
    pub address: String,

    /// Free text description.
    #[serde(default)]
    pub description: Option<String>,

    /// Protocol bindings (default: HTTP and HTTPS).
    #[serde(default = "default_protocol_bindings")]
    pub protocol_bindings: Vec<String>,

    /// Message bindings (default: XML 1.0 and XML 1.1).
    #[serde(default = "default_message_bindings")]
    pub message_bindings: Vec<String>,

    /// Whether the service accepts requests.
    #[serde(default = "default_true")]
    pub available: bool,

    /// Discovery: ids of the services to advertise.
    #[serde(default)]
    pub advertised_services: Vec<String>,

    /// Inbox: accept content of any binding.
    #[serde(default)]
    pub accept_all_content: bool,

    /// Inbox: accepted content bindings.
    #[serde(default)]
    pub supported_content: Vec<ContentBindingEntity>,

    /// Inbox: TAXII 1.1 requests must name destination collections.
    #[serde(default)]
    pub destination_collection_required: bool,

    /// Inbox: handling of named destinations that reject a block's binding.
    #[serde(default)]
    pub mismatch_policy: Option<MismatchPolicy>,
}

impl ServiceConfig {
    /// Minimal service with default bindings.
    pub fn new(id: impl Into<String>, service_type: ServiceType, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            service_type,
            address: address.into(),
            description: None,
            protocol_bindings: default_protocol_bindings(),
            message_bindings: default_message_bindings(),
            available: true,
            advertised_services: Vec::new(),
            accept_all_content: false,
            supported_content: Vec::new(),
            destination_collection_required: false,
            mismatch_policy: None,
        }
    }

    /// Version-neutral service entity.
    #[must_use]
    pub fn to_entity(&self) -> ServiceEntity {
        ServiceEntity {
            id: self.id.clone(),
            service_type: self.service_type,
            address: self.address.clone(),
            description: self.description.clone(),
            protocol_bindings: self.protocol_bindings.clone(),
            message_bindings: self.message_bindings.clone(),
            available: self.available,
        }
    }

    /// Inbox knobs of this service.
    #[must_use]
    pub fn inbox_settings(&self) -> InboxSettings {
        InboxSettings {
            accept_all_content: self.accept_all_content,
            supported_content: self.supported_content.clone(),
            destination_collection_required: self.destination_collection_required,
            mismatch_policy: self.mismatch_policy,
        }
    }
}

/// One collection created at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Unique name.
    pub name: String,

    /// Free text description.
    #[serde(default)]
    pub description: Option<String>,

    /// Feed or set.
    #[serde(default, rename = "type")]
    pub collection_type: CollectionType,

    /// Availability.
    #[serde(default = "default_true")]
    pub available: bool,

    /// Accept content of any binding.
    #[serde(default)]
    pub accept_all_content: bool,

    /// Supported content bindings, empty means any.
    #[serde(default)]
    pub supported_content: Vec<ContentBindingEntity>,

    /// Services the collection is assigned to.
    #[serde(default)]
    pub service_ids: Vec<String>,
}

impl CollectionConfig {
    /// Collection entity described by this entry (not yet persisted).
    #[must_use]
    pub fn to_entity(&self) -> CollectionEntity {
        CollectionEntity {
            id: None,
            name: self.name.clone(),
            description: self.description.clone(),
            collection_type: self.collection_type,
            available: self.available,
            accept_all_content: self.accept_all_content,
            supported_content: self.supported_content.clone(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            state_path: None,
            services: Vec::new(),
            collections: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &std::path::Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config = Self::from_toml(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| crate::SrvError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the topology for inconsistencies.
    pub fn validate(&self) -> crate::Result<()> {
        let mut ids = HashSet::new();
        let mut addresses = HashSet::new();

        for service in &self.services {
            if !ids.insert(service.id.as_str()) {
                return Err(config_err(format!("duplicate service id '{}'", service.id)));
            }
            if !service.address.starts_with('/') {
                return Err(config_err(format!(
                    "service '{}' address must be a path starting with '/'",
                    service.id
                )));
            }
            if !addresses.insert(normalize_path(&service.address)) {
                return Err(config_err(format!(
                    "service '{}' reuses address '{}'",
                    service.id, service.address
                )));
            }
            if service.protocol_bindings.is_empty() || service.message_bindings.is_empty() {
                return Err(config_err(format!(
                    "service '{}' needs at least one protocol and one message binding",
                    service.id
                )));
            }
            if let Some(binding) = service
                .protocol_bindings
                .iter()
                .find(|b| !SUPPORTED_PROTOCOL_BINDINGS.contains(&b.as_str()))
            {
                return Err(config_err(format!(
                    "service '{}' uses unknown protocol binding '{binding}'",
                    service.id
                )));
            }
            if let Some(binding) = service
                .message_bindings
                .iter()
                .find(|b| !SUPPORTED_MESSAGE_BINDINGS.contains(&b.as_str()))
            {
                return Err(config_err(format!(
                    "service '{}' uses unknown message binding '{binding}'",
                    service.id
                )));
            }
        }

        for service in &self.services {
            if let Some(unknown) = service
                .advertised_services
                .iter()
                .find(|id| !ids.contains(id.as_str()))
            {
                return Err(config_err(format!(
                    "service '{}' advertises unknown service '{unknown}'",
                    service.id
                )));
            }
        }

        let mut names = HashSet::new();
        for collection in &self.collections {
            if collection.name.trim().is_empty() {
                return Err(config_err("collection name must not be empty".into()));
            }
            if !names.insert(collection.name.as_str()) {
                return Err(config_err(format!(
                    "duplicate collection name '{}'",
                    collection.name
                )));
            }
        }

        Ok(())
    }

    /// Service entities in configuration order.
    #[must_use]
    pub fn service_entities(&self) -> Vec<ServiceEntity> {
        self.services.iter().map(ServiceConfig::to_entity).collect()
    }
}

fn config_err(message: String) -> crate::SrvError {
    crate::SrvError::Config(message)
}

// Default value functions for serde.
fn default_domain() -> String {
    String::from("localhost:9000")
}

fn default_protocol_bindings() -> Vec<String> {
    vec![VID_TAXII_HTTP_10.to_string(), VID_TAXII_HTTPS_10.to_string()]
}

fn default_message_bindings() -> Vec<String> {
    vec![VID_TAXII_XML_10.to_string(), VID_TAXII_XML_11.to_string()]
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        domain = "taxii.example.com"

        [[services]]
        id = "discovery-a"
        type = "discovery"
        address = "/services/discovery-a"
        advertised_services = ["inbox-a", "discovery-a"]

        [[services]]
        id = "inbox-a"
        type = "inbox"
        address = "/services/inbox-a"
        protocol_bindings = ["urn:taxii.mitre.org:protocol:https:1.0"]
        destination_collection_required = true
        mismatch_policy = "abort"
        supported_content = [{ binding = "urn:stix.mitre.org:xml:1.1.1" }]

        [[collections]]
        name = "indicators"
        type = "DATA_SET"
        service_ids = ["inbox-a"]
        supported_content = [
            { binding = "urn:stix.mitre.org:xml:1.1.1", subtypes = ["indicator"] },
        ]
    "#;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.domain, "localhost:9000");
        assert!(config.services.is_empty());
        assert!(config.collections.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_topology() {
        let config = ServerConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.domain, "taxii.example.com");
        assert_eq!(config.services.len(), 2);

        let discovery = &config.services[0];
        assert_eq!(discovery.service_type, ServiceType::Discovery);
        assert_eq!(discovery.protocol_bindings.len(), 2);
        assert_eq!(discovery.message_bindings.len(), 2);

        let inbox = &config.services[1];
        assert_eq!(inbox.protocol_bindings, vec![VID_TAXII_HTTPS_10]);
        assert!(inbox.destination_collection_required);
        assert_eq!(inbox.mismatch_policy, Some(MismatchPolicy::Abort));

        let collection = &config.collections[0];
        assert_eq!(collection.collection_type, CollectionType::Set);
        assert!(collection.available);
        assert_eq!(collection.supported_content[0].subtypes, vec!["indicator"]);
    }

    #[test]
    fn test_duplicate_service_ids_are_rejected() {
        let mut config = ServerConfig::default();
        config
            .services
            .push(ServiceConfig::new("a", ServiceType::Poll, "/a"));
        config
            .services
            .push(ServiceConfig::new("a", ServiceType::Inbox, "/b"));
        assert!(matches!(config.validate(), Err(crate::SrvError::Config(_))));
    }

    #[test]
    fn test_addresses_differing_by_trailing_slash_are_rejected() {
        let mut config = ServerConfig::default();
        config
            .services
            .push(ServiceConfig::new("a", ServiceType::Poll, "/services/a"));
        config
            .services
            .push(ServiceConfig::new("b", ServiceType::Inbox, "/services/a/"));
        assert!(matches!(
            config.validate(),
            Err(crate::SrvError::Config(message)) if message.contains("reuses address")
        ));
    }

    #[test]
    fn test_unknown_advertised_service_is_rejected() {
        let mut discovery = ServiceConfig::new("d", ServiceType::Discovery, "/d");
        discovery.advertised_services = vec!["missing".into()];
        let config = ServerConfig {
            services: vec![discovery],
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_relative_address_is_rejected() {
        let config = ServerConfig {
            services: vec![ServiceConfig::new("p", ServiceType::Poll, "services/poll")],
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert!(config.services.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{SAMPLE}").unwrap();
        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.service_entities().len(), 2);
        assert_eq!(config.collections[0].to_entity().name, "indicators");
    }
}

//! Core types for the TAXII 1.x threat intelligence exchange protocol.
//!
//! This crate provides the foundations shared by the server:
//!
//! - **Entities**: Version-neutral domain objects (collections, content blocks,
//!   content bindings, services, subscriptions)
//! - **Exchange**: Version-neutral request/response model the services program against
//! - **Messages**: The TAXII 1.0 and 1.1 wire message sets ([`tm10`], [`tm11`])
//! - **Errors**: Protocol error taxonomy with [`TaxiiError`]
//!
//! # Example
//!
//! ```rust,ignore
//! use taxii_core::{ContentBindingEntity, CollectionEntity};
//!
//! let stix = ContentBindingEntity::new(taxii_core::constants::CB_STIX_XML_111);
//! let collection = CollectionEntity::new("indicators").with_supported_content(vec![stix.clone()]);
//! assert!(collection.accepts(&stix));
//! ```

pub mod constants;
mod entities;
mod error;
mod exchange;
pub mod messages;
pub mod status;
mod version;

pub use entities::*;
pub use error::{Result, TaxiiError};
pub use exchange::*;
pub use messages::{tm10, tm11, MessageKind, VersionedMessage};
pub use status::{StatusDetail, StatusType};
pub use version::ProtocolVersion;

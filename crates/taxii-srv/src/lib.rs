//! taxii-srv: TAXII 1.0/1.1 threat intelligence sharing server core.
//!
//! Hosts the four TAXII service kinds over a pluggable repository:
//! - **Discovery** advertises the configured services
//! - **Collection management** describes collections and manages subscriptions
//! - **Inbox** accepts content blocks into collections
//! - **Poll** serves content blocks out of collections
//!
//! # Request flow
//!
//! [`TaxiiServer::handle`] receives `(path, headers, body)` from the HTTP
//! transport. Headers select the protocol version, the body is decoded into a
//! [`taxii_core::VersionedMessage`], converted to a version-neutral request and
//! handed to the service registered under the path. The neutral response is
//! converted back into the version the client accepts.
//!
//! Persistence sits behind [`data::Repository`]; [`data::MemoryRepository`]
//! is the bundled backend and can snapshot itself to JSON.

pub mod config;
pub mod data;
pub mod error;
pub mod http;
pub mod server;
pub mod services;
pub mod transform;

#[cfg(test)]
mod test_support;

// Re-exports for convenience.
pub use config::ServerConfig;
pub use error::SrvError;
pub use server::TaxiiServer;

/// Result type for taxii-srv operations.
pub type Result<T> = std::result::Result<T, SrvError>;

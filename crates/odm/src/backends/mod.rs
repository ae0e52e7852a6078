//! Document store implementations.
//!
//! Each implementation provides [`SearchClient`](crate::core::SearchClient).
//!
//! # Available Clients
//!
//! | Client | Feature | Description |
//! |--------|---------|-------------|
//! | Memory | (always) | Process-local store for tests and local runs |
//! | Elasticsearch | `elasticsearch` | HTTP client for an Elasticsearch 8 cluster |
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "elasticsearch")]
//! use helios_odm::backends::elasticsearch::{ElasticsearchClient, ElasticsearchConfig};
//!
//! # #[cfg(feature = "elasticsearch")]
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ElasticsearchClient::new(ElasticsearchConfig {
//!     nodes: vec!["http://localhost:9200".to_string()],
//!     ..Default::default()
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod memory;

#[cfg(feature = "elasticsearch")]
pub mod elasticsearch;

pub use memory::InMemoryClient;

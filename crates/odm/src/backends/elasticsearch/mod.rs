//! Elasticsearch client adapter.
//!
//! Wraps the official `elasticsearch` crate behind
//! [`SearchClient`](crate::core::SearchClient). Requests go to the first
//! configured node through a single-node connection pool.
//!
//! Indices are untyped (Elasticsearch 8): mappings are read from and written
//! to the index's `mappings.properties`.
//!
//! # Example
//!
//! ```ignore
//! use helios_odm::backends::elasticsearch::{ElasticsearchAuth, ElasticsearchClient, ElasticsearchConfig};
//!
//! let config = ElasticsearchConfig {
//!     nodes: vec!["https://search.internal:9200".to_string()],
//!     auth: Some(ElasticsearchAuth::Basic {
//!         username: "elastic".to_string(),
//!         password: "changeme".to_string(),
//!     }),
//!     ..Default::default()
//! };
//! let client = ElasticsearchClient::new(config)?;
//! ```

mod backend;
mod client;

pub use backend::{ElasticsearchAuth, ElasticsearchClient, ElasticsearchConfig};

//! Core store abstractions.
//!
//! The mapper never talks to Elasticsearch directly. Everything it needs from
//! the store goes through [`SearchClient`]:
//!
//! - index lifecycle: existence, creation with settings, aliases, mappings
//! - document CRUD by identifier, including bulk insertion
//! - search and count with raw query DSL bodies
//!
//! # Implementations
//!
//! | Client | Module | Notes |
//! |--------|--------|-------|
//! | `ElasticsearchClient` | `backends::elasticsearch` | `elasticsearch` feature |
//! | `InMemoryClient` | `backends::memory` | always available |

mod client;

pub use client::{ClientResponse, Document, SearchClient, SearchResponse};

//! # helios-odm
//!
//! Metadata-driven object-document mapping for Elasticsearch.
//!
//! Domain types register their shape once ([`Reflect`]); YAML metadata
//! describes how their properties map to document fields. A navigator walks
//! objects using that metadata and hands every value to a visitor, which
//! converts it to document JSON (or back). Repositories use the resulting
//! transformer to store and search entities in per-class indices.
//!
//! ## Layers
//!
//! - [`reflect`] / [`value`] - registered class shapes and dynamic values
//! - [`metadata`] - class and property descriptors built from YAML
//! - [`transformer`] - the navigator, the visitor pair and the transformer facade
//! - [`core`] - the [`SearchClient`] store interface
//! - [`backends`] - in-memory and Elasticsearch clients
//! - [`repository`] - index lifecycle, repositories and their factory
//! - [`config`] - configuration of the whole stack
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use helios_odm::{InMemoryClient, OdmConfig, TypeRegistry};
//!
//! let registry = Arc::new(TypeRegistry::new().with::<Product>());
//! let config = OdmConfig::for_testing("config/odm");
//! let factory = config.repository_factory(Arc::new(InMemoryClient::new()), registry)?;
//!
//! let repository = factory.repository::<Product>().await?;
//! repository.lock().await.save(&product).await?;
//! ```
//!
//! Metadata for `app::Product` lives in `config/odm/app.Product.yaml`:
//!
//! ```yaml
//! app::Product:
//!   index:
//!     name: product
//!   properties:
//!     id:
//!       type: string
//!       mapping: { type: keyword }
//!     price:
//!       type: double
//!       mapping: { type: double }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod core;
pub mod error;
pub mod metadata;
pub mod reflect;
pub mod repository;
pub mod transformer;
pub mod value;

// Re-export commonly used types at crate root
pub use config::{MetadataDirectory, OdmConfig};
pub use error::{
    IndexError, MetadataError, OdmError, OdmResult, PropertyError, StoreError, TransformError,
};
pub use reflect::{ClassShape, Entity, Reflect, TypeRegistry, Visibility};
pub use value::Value;

// Re-export the store seam
pub use backends::InMemoryClient;
pub use core::{ClientResponse, Document, SearchClient, SearchResponse};

// Re-export metadata, transformation and repositories
pub use metadata::{ClassDescriptor, MetadataFactory, PropertyDescriptor, TypeTag, YamlDriver};
pub use repository::{
    DocumentSupport, ElasticsearchRepository, IndexMapping, RepositoryFactory,
};
pub use transformer::{DataNavigator, DataTransformer, ElasticsearchTransformer};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

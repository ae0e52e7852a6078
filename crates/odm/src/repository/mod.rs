//! Repositories over Elasticsearch indices.
//!
//! [`IndexMapping`] resolves the index of each entity class, creating it
//! and defining its field mapping on first use. [`ElasticsearchRepository`]
//! converts entities to documents through a
//! [`DataTransformer`](crate::transformer::DataTransformer) and runs CRUD and
//! search against the index. [`RepositoryFactory`] hands out one shared
//! repository per entity.
//!
//! # Example
//!
//! ```ignore
//! let factory = RepositoryFactory::new(index_mapping, transformer, metadata);
//! let repository = factory.repository::<Product>().await?;
//! let mut repository = repository.lock().await;
//!
//! repository.save(&product).await?;
//! let cheap = repository
//!     .find_by(json!({"range": {"price": {"lt": 10}}}), Some(("price", "asc")), None, None)
//!     .await?;
//! ```

mod factory;
mod index;
mod mapping;
mod query;
#[allow(clippy::module_inception)]
mod repository;

pub use factory::{CustomRepository, RepositoryFactory, SharedRepository};
pub use index::Index;
pub use mapping::{IndexMapping, mapping_difference};
pub use query::{AggregationBuilder, Query, SortOrder};
pub use repository::{
    DEFAULT_FIND_LIMIT, DocumentSupport, ElasticsearchRepository, LogKind, index_name_for_class,
};

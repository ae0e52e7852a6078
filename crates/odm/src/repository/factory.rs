//! Repository resolution and caching per entity class, including
//! custom repositories named by metadata.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

use crate::error::{MetadataError, OdmResult};
use crate::metadata::{ClassDescriptor, MetadataFactory};
use crate::reflect::Reflect;
use crate::repository::mapping::IndexMapping;
use crate::repository::repository::{DocumentSupport, ElasticsearchRepository};
use crate::transformer::DataTransformer;

/// A repository shared between callers of the factory.
pub type SharedRepository<R> = Arc<AsyncMutex<R>>;

/// Repository type bound to an entity through its `customRepositoryName`.
pub trait CustomRepository<T>: Send + 'static {
    /// Name the entity's metadata refers to.
    const NAME: &'static str;

    /// Wraps the base repository of the entity.
    fn from_repository(repository: ElasticsearchRepository<T>) -> Self;
}

/// Creates repositories and keeps one per entity (or custom repository).
pub struct RepositoryFactory {
    index_mapping: Arc<IndexMapping>,
    transformer: Arc<dyn DataTransformer>,
    metadata: Arc<MetadataFactory>,
    repositories: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl fmt::Debug for RepositoryFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.repositories.lock().keys().cloned().collect();
        names.sort();
        f.debug_struct("RepositoryFactory")
            .field("index_mapping", &self.index_mapping)
            .field("repositories", &names)
            .finish_non_exhaustive()
    }
}

impl RepositoryFactory {
    /// Creates a factory.
    pub fn new(
        index_mapping: Arc<IndexMapping>,
        transformer: Arc<dyn DataTransformer>,
        metadata: Arc<MetadataFactory>,
    ) -> Self {
        Self {
            index_mapping,
            transformer,
            metadata,
            repositories: Mutex::new(HashMap::new()),
        }
    }

    /// The index mapping repositories resolve their index through.
    pub fn index_mapping(&self) -> &Arc<IndexMapping> {
        &self.index_mapping
    }

    /// Returns the repository of `T`, creating it on first use.
    pub async fn repository<T>(&self) -> OdmResult<SharedRepository<ElasticsearchRepository<T>>>
    where
        T: Reflect + DocumentSupport,
    {
        self.require_metadata(T::CLASS)?;

        if let Some(repository) = self.cached(T::CLASS) {
            return Ok(repository);
        }

        let repository = ElasticsearchRepository::<T>::new(
            &self.index_mapping,
            self.transformer.clone(),
        )
        .await?;
        tracing::debug!(class = T::CLASS, "Created repository");

        Ok(self.store(T::CLASS, repository))
    }

    /// Returns the custom repository `R` of `T`, creating it on first use.
    ///
    /// Fails with a config error unless the metadata of `T` names `R`.
    pub async fn custom_repository<T, R>(&self) -> OdmResult<SharedRepository<R>>
    where
        T: Reflect + DocumentSupport,
        R: CustomRepository<T>,
    {
        let metadata = self.require_metadata(T::CLASS)?;

        match metadata.custom_repository_name() {
            Some(name) if name == R::NAME => {}
            Some(name) => {
                return Err(MetadataError::config(
                    T::CLASS,
                    format!(
                        "class is bound to custom repository {}, not {}",
                        name,
                        R::NAME
                    ),
                )
                .into());
            }
            None => {
                return Err(MetadataError::config(
                    T::CLASS,
                    format!("no custom repository is configured, cannot create {}", R::NAME),
                )
                .into());
            }
        }

        if let Some(repository) = self.cached(R::NAME) {
            return Ok(repository);
        }

        let base = ElasticsearchRepository::<T>::new(
            &self.index_mapping,
            self.transformer.clone(),
        )
        .await?;
        tracing::debug!(class = T::CLASS, repository = R::NAME, "Created custom repository");

        Ok(self.store(R::NAME, R::from_repository(base)))
    }

    fn require_metadata(&self, class: &str) -> OdmResult<Arc<ClassDescriptor>> {
        self.metadata.get_metadata_for_class(class)?.ok_or_else(|| {
            MetadataError::config(class, "no metadata config was found for the class").into()
        })
    }

    fn cached<R: Send + 'static>(&self, key: &str) -> Option<SharedRepository<R>> {
        let entry = self.repositories.lock().get(key).cloned()?;
        entry.downcast::<AsyncMutex<R>>().ok()
    }

    /// Caches `repository` under `key`; a repository stored concurrently wins.
    fn store<R: Send + 'static>(&self, key: &str, repository: R) -> SharedRepository<R> {
        let shared: SharedRepository<R> = Arc::new(AsyncMutex::new(repository));
        let entry = self
            .repositories
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| shared.clone() as Arc<dyn Any + Send + Sync>)
            .clone();
        entry.downcast::<AsyncMutex<R>>().unwrap_or(shared)
    }
}

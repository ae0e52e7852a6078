//! Cached, hierarchy-aware metadata resolution.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{MetadataError, OdmResult};
use crate::metadata::class::ClassDescriptor;
use crate::metadata::driver::MetadataSource;
use crate::reflect::{ClassShape, TypeRegistry};

/// Resolves and caches [`ClassDescriptor`]s.
///
/// Metadata for a class is built on first request by walking its registered
/// hierarchy from the root down and merging what each class declares; the
/// most derived configuration wins. Results (including "no metadata") are
/// cached for the lifetime of the factory.
pub struct MetadataFactory {
    registry: Arc<TypeRegistry>,
    source: Box<dyn MetadataSource>,
    cache: RwLock<HashMap<String, Option<Arc<ClassDescriptor>>>>,
}

impl MetadataFactory {
    /// Creates a factory over a type registry and a metadata source.
    pub fn new(registry: Arc<TypeRegistry>, source: impl MetadataSource + 'static) -> Self {
        Self {
            registry,
            source: Box::new(source),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The type registry backing this factory.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// The registered shape of `class`.
    pub fn shape(&self, class: &str) -> Option<Arc<ClassShape>> {
        self.registry.get(class)
    }

    /// Returns the metadata of `class`, or `None` when neither the class nor
    /// any of its ancestors is configured.
    pub fn get_metadata_for_class(&self, class: &str) -> OdmResult<Option<Arc<ClassDescriptor>>> {
        if let Some(cached) = self.cache.read().get(class) {
            return Ok(cached.clone());
        }

        let resolved = self.load(class)?.map(Arc::new);
        self.cache
            .write()
            .entry(class.to_string())
            .or_insert(resolved.clone());
        Ok(resolved)
    }

    /// Like [`MetadataFactory::get_metadata_for_class`] but fails when the
    /// class has no metadata.
    pub fn require_metadata_for_class(&self, class: &str) -> OdmResult<Arc<ClassDescriptor>> {
        self.get_metadata_for_class(class)?.ok_or_else(|| {
            MetadataError::NoMetadata {
                class: class.to_string(),
            }
            .into()
        })
    }

    /// Resolves metadata for every registered class ahead of use.
    pub fn warm_up(&self) -> OdmResult<usize> {
        let mut classes: Vec<String> = self
            .registry
            .class_names()
            .map(str::to_string)
            .collect();
        classes.sort();

        let mut resolved = 0;
        for class in classes {
            if self.get_metadata_for_class(&class)?.is_some() {
                resolved += 1;
            }
        }
        tracing::info!("Metadata cache warmed up for {} classes", resolved);
        Ok(resolved)
    }

    fn load(&self, class: &str) -> OdmResult<Option<ClassDescriptor>> {
        let Some(shape) = self.registry.get(class) else {
            tracing::debug!("Class '{}' is not registered; no metadata", class);
            return Ok(None);
        };

        let mut merged = ClassDescriptor::new(class);
        let mut found = false;

        for ancestor in self.registry.hierarchy(class) {
            let parent = self
                .registry
                .get(&ancestor)
                .and_then(|s| s.parent().map(str::to_string));

            if let Some(descriptor) =
                self.source
                    .load_metadata_for_class(&shape, &ancestor, parent.as_deref())?
            {
                merged.merge(descriptor);
                found = true;
            }
        }

        Ok(found.then_some(merged))
    }
}

impl std::fmt::Debug for MetadataFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataFactory")
            .field("registered_classes", &self.registry.len())
            .field("cached_classes", &self.cache.read().len())
            .finish()
    }
}

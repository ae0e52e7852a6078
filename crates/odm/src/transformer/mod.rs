//! Bidirectional data transformation.
//!
//! A [`DataNavigator`] walks values using class metadata and hands each one
//! to a [`Visitor`]. The Elasticsearch visitor pair converts between domain
//! objects and document JSON; [`ElasticsearchTransformer`] packages the pair
//! behind the [`DataTransformer`] facade used by repositories.
//!
//! Transformation is synchronous and runs to completion on the caller's
//! thread.

pub mod config;
pub mod datetime;
pub mod elasticsearch;
pub mod navigator;
pub mod visitor;

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::error::{OdmResult, TransformError};
use crate::metadata::MetadataFactory;
use crate::reflect::{Entity, Reflect};
use crate::value::Value;

pub use config::TypeConfig;
pub use elasticsearch::{ElasticsearchVisitor, ReverseElasticsearchVisitor};
pub use navigator::{DataNavigator, Navigation, DEFAULT_MAX_DEPTH};
pub use visitor::{Navigable, Visitor};

/// Converts domain objects to document payloads and back.
pub trait DataTransformer: Send + Sync {
    /// Transforms an object into its document payload.
    fn transform(&self, object: &dyn Entity) -> OdmResult<JsonValue>;

    /// Populates `target` from a document payload and returns it.
    ///
    /// Fails with a transformation error when no target is given.
    fn reverse_transform(
        &self,
        payload: JsonValue,
        target: Option<Box<dyn Entity>>,
    ) -> OdmResult<Box<dyn Entity>>;

    /// Typed variant of [`DataTransformer::reverse_transform`].
    fn reverse_transform_into<T: Reflect>(&self, payload: JsonValue, target: T) -> OdmResult<T>
    where
        Self: Sized,
    {
        let object = self.reverse_transform(payload, Some(Box::new(target)))?;
        let actual = object.class_name().to_string();
        object
            .into_any()
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| {
                TransformError::failed(format!(
                    "reverse transformation produced {} instead of {}",
                    actual,
                    T::CLASS
                ))
                .into()
            })
    }
}

/// Elasticsearch document transformer.
#[derive(Debug, Clone)]
pub struct ElasticsearchTransformer {
    navigator: DataNavigator,
    visitor: ElasticsearchVisitor,
    reverse_visitor: ReverseElasticsearchVisitor,
}

impl ElasticsearchTransformer {
    /// Creates a transformer over `navigator`.
    pub fn new(navigator: DataNavigator) -> Self {
        Self {
            navigator,
            visitor: ElasticsearchVisitor,
            reverse_visitor: ReverseElasticsearchVisitor,
        }
    }

    /// Creates a transformer with a default navigator over `metadata`.
    pub fn from_metadata(metadata: Arc<MetadataFactory>) -> Self {
        Self::new(DataNavigator::new(metadata))
    }

    /// The underlying navigator.
    pub fn navigator(&self) -> &DataNavigator {
        &self.navigator
    }

    /// Transforms an arbitrary domain value.
    pub fn transform_value(&self, value: Value) -> OdmResult<JsonValue> {
        self.navigator.navigate(value, &self.visitor, None)
    }
}

impl DataTransformer for ElasticsearchTransformer {
    fn transform(&self, object: &dyn Entity) -> OdmResult<JsonValue> {
        self.transform_value(Value::Object(object.clone_entity()))
    }

    fn reverse_transform(
        &self,
        payload: JsonValue,
        target: Option<Box<dyn Entity>>,
    ) -> OdmResult<Box<dyn Entity>> {
        let target = target.ok_or_else(|| {
            TransformError::failed("an object must be passed to reverse_transform")
        })?;

        let config = TypeConfig::object(target.class_name()).with_populate(target);

        match self
            .navigator
            .navigate(payload, &self.reverse_visitor, Some(config))?
        {
            Value::Object(object) => Ok(object),
            other => Err(TransformError::failed(format!(
                "reverse transformation produced {} instead of an object",
                other.kind()
            ))
            .into()),
        }
    }
}

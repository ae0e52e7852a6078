//! Metadata-driven traversal of object graphs and documents.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::error::{MetadataError, OdmResult, TransformError};
use crate::metadata::{ClassDescriptor, MetadataFactory, PropertyDescriptor, TypeTag};
use crate::reflect::Entity;
use crate::transformer::config::TypeConfig;
use crate::transformer::visitor::{Navigable, Visitor};
use crate::value::Value;

/// Default limit on how deeply values may nest.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Walks values, dispatching each to the matching visitor method.
#[derive(Debug, Clone)]
pub struct DataNavigator {
    metadata: Arc<MetadataFactory>,
    max_depth: usize,
}

impl DataNavigator {
    /// Creates a navigator over a shared metadata factory.
    pub fn new(metadata: Arc<MetadataFactory>) -> Self {
        Self {
            metadata,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the nesting limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The nesting limit.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// The metadata factory.
    pub fn metadata_factory(&self) -> &Arc<MetadataFactory> {
        &self.metadata
    }

    /// Metadata of `class`, failing with a no-metadata error when absent.
    pub fn get_metadata_for_class(&self, class: &str) -> OdmResult<Arc<ClassDescriptor>> {
        self.metadata.require_metadata_for_class(class)
    }

    /// Navigates `data` with `visitor`. The config is inferred from the data
    /// when not given.
    pub fn navigate<V: Visitor>(
        &self,
        data: V::Input,
        visitor: &V,
        config: Option<TypeConfig>,
    ) -> OdmResult<V::Output> {
        Navigation {
            navigator: self,
            depth: 0,
        }
        .navigate(data, visitor, config)
    }
}

/// State of one traversal; handed to visitors for nested values.
#[derive(Debug)]
pub struct Navigation<'a> {
    navigator: &'a DataNavigator,
    depth: usize,
}

impl<'a> Navigation<'a> {
    /// The navigator driving this traversal.
    pub fn navigator(&self) -> &'a DataNavigator {
        self.navigator
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Navigates a nested value.
    pub fn navigate<V: Visitor>(
        &mut self,
        data: V::Input,
        visitor: &V,
        config: Option<TypeConfig>,
    ) -> OdmResult<V::Output> {
        if self.depth >= self.navigator.max_depth {
            return Err(TransformError::DepthExceeded {
                max_depth: self.navigator.max_depth,
            }
            .into());
        }

        let config = config.unwrap_or_else(|| data.suggested_config());

        self.depth += 1;
        let result = self.apply_visitor(data, visitor, config);
        self.depth -= 1;
        result
    }

    fn apply_visitor<V: Visitor>(
        &mut self,
        data: V::Input,
        visitor: &V,
        config: TypeConfig,
    ) -> OdmResult<V::Output> {
        match config.type_tag {
            TypeTag::Null => visitor.visit_null(data, config, self),
            TypeTag::String => visitor.visit_string(data, config, self),
            TypeTag::Integer => visitor.visit_integer(data, config, self),
            TypeTag::Boolean => visitor.visit_boolean(data, config, self),
            TypeTag::Double => visitor.visit_double(data, config, self),
            TypeTag::Date => visitor.visit_date(data, config, self),
            TypeTag::DateTime => visitor.visit_date_time(data, config, self),
            TypeTag::Time => visitor.visit_time(data, config, self),
            TypeTag::Array => visitor.visit_array(data, config, self),
            TypeTag::Object => visitor.visit_object(data, config, self),
        }
    }

    /// Extracts the mapped properties of `object`, in metadata order, as
    /// `(field name, visited value)` pairs.
    pub fn navigate_object<V>(
        &mut self,
        object: &dyn Entity,
        visitor: &V,
    ) -> OdmResult<Vec<(String, V::Output)>>
    where
        V: Visitor<Input = Value>,
    {
        let metadata = self
            .navigator
            .get_metadata_for_class(object.class_name())?;

        let mut fields = Vec::with_capacity(metadata.properties().len());
        for property in metadata.properties() {
            let value = property.get_value(object)?;
            let config = property_config(property, &value);
            let visited = self.navigate(value, visitor, config)?;
            fields.push((property.field_name().to_string(), visited));
        }
        Ok(fields)
    }

    /// Fills an object from a document's fields.
    ///
    /// `config.class` names the class; `config.populate`, when set, is filled
    /// in place. Fields absent from `data` leave the object untouched.
    pub fn hydrate_object<V>(
        &mut self,
        mut data: serde_json::Map<String, JsonValue>,
        config: TypeConfig,
        visitor: &V,
    ) -> OdmResult<Box<dyn Entity>>
    where
        V: Visitor<Input = JsonValue, Output = Value>,
    {
        let class = config.class.ok_or_else(|| {
            MetadataError::config(
                "<unknown>",
                "reverse navigation of objects requires the object class",
            )
        })?;

        let metadata = self.navigator.get_metadata_for_class(&class)?;

        let mut object = match config.populate {
            Some(object) => object,
            None => self
                .navigator
                .metadata
                .shape(&class)
                .ok_or_else(|| MetadataError::NoMetadata {
                    class: class.clone(),
                })?
                .instantiate(),
        };

        for property in metadata.properties() {
            if property.is_read_only() {
                continue;
            }
            let Some(raw) = data.remove(property.field_name()) else {
                continue;
            };

            let config = reverse_property_config(property, object.as_ref())?;
            let value = self.navigate(raw, visitor, Some(config))?;
            property.set_value(object.as_mut(), value)?;
        }

        Ok(object)
    }
}

/// Config for extracting a property value; `None` lets the navigator infer.
fn property_config(property: &PropertyDescriptor, value: &Value) -> Option<TypeConfig> {
    let type_tag = property.type_tag()?;

    let config = match type_tag {
        TypeTag::Object => {
            let class = property
                .type_class()
                .map(str::to_string)
                .or_else(|| value.as_entity().map(|e| e.class_name().to_string()));
            TypeConfig::new(type_tag).with_opt_class(class)
        }
        TypeTag::Array => TypeConfig::new(type_tag).with_opt_class(property.type_class()),
        _ => TypeConfig::new(type_tag),
    };
    Some(config)
}

/// Config for hydrating a property; types must be explicit.
fn reverse_property_config(
    property: &PropertyDescriptor,
    object: &dyn Entity,
) -> OdmResult<TypeConfig> {
    let type_tag = property.type_tag().ok_or_else(|| {
        MetadataError::config(
            property.class(),
            format!(
                "all properties must have a type set for reverse navigation, {}",
                property.name()
            ),
        )
    })?;

    match type_tag {
        TypeTag::Object => {
            let class = property.type_class().ok_or_else(|| {
                MetadataError::config(
                    property.class(),
                    format!(
                        "property {} could not resolve its class; add type_class to the property config",
                        property.name()
                    ),
                )
            })?;
            let config = TypeConfig::object(class);
            match property.get_value(object)? {
                Value::Object(related) => Ok(config.with_populate(related)),
                _ => Ok(config),
            }
        }
        TypeTag::Array => Ok(TypeConfig::new(type_tag).with_opt_class(property.type_class())),
        _ => Ok(TypeConfig::new(type_tag)),
    }
}

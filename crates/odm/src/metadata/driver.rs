//! YAML metadata driver.
//!
//! Reads the configuration document of a class and turns it into a
//! [`ClassDescriptor`]. The document is a map keyed by class identity:
//!
//! ```yaml
//! app::model::Person:
//!   exposeAll: false
//!   customRepositoryName: PersonRepository
//!   use_default_accessors: true
//!   index:
//!     name: people
//!     alias: people_alias
//!     settings:
//!       number_of_shards: 1
//!   properties:
//!     name:
//!       field_name: full_name
//!       type: string
//!       mapping: { type: keyword }
//!     birthDate:
//!       type: date
//!       accessor: { getter: getBirthDate, setter: setBirthDate }
//!   virtual_properties:
//!     getAge:
//!       type: integer
//! ```

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::{MetadataError, OdmResult};
use crate::metadata::class::{ClassDescriptor, IndexConfig};
use crate::metadata::property::PropertyDescriptor;
use crate::metadata::source::ConfigSource;
use crate::metadata::types::TypeTag;
use crate::reflect::{ClassShape, PropertyShape};

static VAR_ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@var\s+([^\s]+)").expect("pattern is valid"));

/// Produces per-class metadata.
pub trait MetadataSource: Send + Sync {
    /// Loads the metadata that `class` declares, bound to `shape`.
    ///
    /// `shape` is the shape of the class being resolved; `class` is either
    /// that class or one of its ancestors. Returns `None` when `class` has
    /// no configuration.
    fn load_metadata_for_class(
        &self,
        shape: &Arc<ClassShape>,
        class: &str,
        parent: Option<&str>,
    ) -> OdmResult<Option<ClassDescriptor>>;
}

/// Class-level configuration block.
#[derive(Debug, Clone, Deserialize)]
struct ClassConfig {
    #[serde(rename = "exposeAll", default = "default_expose_all")]
    expose_all: bool,

    #[serde(default)]
    index: Option<IndexConfig>,

    #[serde(rename = "customRepositoryName", default)]
    custom_repository_name: Option<String>,

    #[serde(default)]
    use_default_accessors: bool,

    #[serde(default)]
    properties: HashMap<String, Option<PropertyConfig>>,

    #[serde(default)]
    virtual_properties: serde_json::Map<String, JsonValue>,
}

fn default_expose_all() -> bool {
    true
}

/// Per-property configuration block.
#[derive(Debug, Clone, Default, Deserialize)]
struct PropertyConfig {
    #[serde(default)]
    field_name: Option<String>,

    #[serde(rename = "type", default)]
    type_tag: Option<String>,

    #[serde(default)]
    type_class: Option<String>,

    #[serde(default)]
    expose: Option<bool>,

    #[serde(default)]
    accessor: Option<AccessorConfig>,

    #[serde(default)]
    mapping: Option<JsonValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AccessorConfig {
    #[serde(default)]
    getter: Option<String>,

    #[serde(default)]
    setter: Option<String>,
}

/// Metadata driver reading YAML documents from a [`ConfigSource`].
#[derive(Debug)]
pub struct YamlDriver {
    source: Box<dyn ConfigSource>,
}

impl YamlDriver {
    /// Creates a driver over `source`.
    pub fn new(source: impl ConfigSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    fn process_properties(
        &self,
        shape: &Arc<ClassShape>,
        class: &str,
        parent: Option<&str>,
        config: &ClassConfig,
        descriptor: &mut ClassDescriptor,
    ) -> Result<(), MetadataError> {
        let eligible = shape.properties().iter().filter(|p| {
            p.declaring_class() == class || Some(p.declaring_class()) == parent
        });

        for property in eligible {
            let property_config = config.properties.get(property.name()).cloned().flatten();

            if property_config.is_none() && !config.expose_all {
                continue;
            }
            let property_config = property_config.unwrap_or_default();
            if property_config.expose == Some(false) {
                continue;
            }

            let mut metadata = PropertyDescriptor::new(shape.clone(), property.name());
            apply_property_config(
                &mut metadata,
                &property_config,
                config.use_default_accessors,
                class,
            )?;

            if metadata.type_tag().is_none() {
                metadata.set_type(type_from_annotation(property));
            }

            descriptor.add_property(metadata);
        }
        Ok(())
    }

    fn process_virtual_properties(
        &self,
        shape: &Arc<ClassShape>,
        class: &str,
        config: &ClassConfig,
        descriptor: &mut ClassDescriptor,
    ) -> Result<(), MetadataError> {
        for (method, raw) in &config.virtual_properties {
            if !shape.has_method(method) {
                return Err(MetadataError::config(
                    class,
                    format!("the method {} was not found in class {}", method, class),
                ));
            }

            let virtual_config: Option<PropertyConfig> = serde_json::from_value(raw.clone())
                .map_err(|e| {
                    MetadataError::config(class, format!("invalid virtual property {}: {}", method, e))
                })?;

            let mut metadata = PropertyDescriptor::virtual_property(shape.clone(), method);
            apply_property_config(&mut metadata, &virtual_config.unwrap_or_default(), false, class)?;
            descriptor.add_property(metadata);
        }
        Ok(())
    }
}

impl MetadataSource for YamlDriver {
    fn load_metadata_for_class(
        &self,
        shape: &Arc<ClassShape>,
        class: &str,
        parent: Option<&str>,
    ) -> OdmResult<Option<ClassDescriptor>> {
        let Some(document) = self.source.load(class)? else {
            return Ok(None);
        };

        let raw = document.tree.get(class).ok_or_else(|| {
            MetadataError::config(
                class,
                format!(
                    "expected metadata for class {} to be defined in {}",
                    class, document.origin
                ),
            )
        })?;

        let config: ClassConfig = match raw {
            JsonValue::Null => serde_json::from_value(JsonValue::Object(Default::default())),
            other => serde_json::from_value(other.clone()),
        }
        .map_err(|e| MetadataError::config(class, format!("invalid class config: {}", e)))?;

        let mut descriptor = ClassDescriptor::new(class);
        descriptor.set_index(config.index.clone());
        descriptor.set_custom_repository_name(config.custom_repository_name.clone());

        self.process_properties(shape, class, parent, &config, &mut descriptor)?;
        self.process_virtual_properties(shape, class, &config, &mut descriptor)?;

        tracing::debug!(
            "Loaded metadata for class '{}' from {} ({} properties)",
            class,
            document.origin,
            descriptor.properties().len()
        );

        Ok(Some(descriptor))
    }
}

fn apply_property_config(
    metadata: &mut PropertyDescriptor,
    config: &PropertyConfig,
    use_default_accessors: bool,
    class: &str,
) -> Result<(), MetadataError> {
    if let Some(field_name) = &config.field_name {
        metadata.set_field_name(Some(field_name.clone()));
    }

    if let Some(tag) = &config.type_tag {
        let type_tag = TypeTag::parse(tag).ok_or_else(|| {
            MetadataError::config(
                class,
                format!("unknown type '{}' for property {}", tag, metadata.name()),
            )
        })?;
        metadata.set_type(Some(type_tag));

        if let Some(type_class) = &config.type_class {
            metadata.set_type_class(Some(type_class.clone()));
        }
    }

    if use_default_accessors {
        metadata.resolve_default_accessors();
    }

    if let Some(accessor) = &config.accessor {
        if let Some(getter) = &accessor.getter {
            metadata.set_getter_accessor(getter)?;
        }
        if let Some(setter) = &accessor.setter {
            metadata.set_setter_accessor(setter)?;
        }
    }

    if let Some(mapping) = &config.mapping {
        metadata.set_mapping(Some(mapping.clone()));
    }

    Ok(())
}

/// Infers a type from the `@var` annotation of the property's doc comment.
fn type_from_annotation(property: &PropertyShape) -> Option<TypeTag> {
    let doc = property.doc_comment()?;
    let captures = VAR_ANNOTATION.captures(doc)?;
    match captures.get(1)?.as_str() {
        "resource" => None,
        "string" => Some(TypeTag::String),
        "integer" | "int" => Some(TypeTag::Integer),
        "float" => Some(TypeTag::Double),
        "boolean" | "bool" => Some(TypeTag::Boolean),
        "array" => Some(TypeTag::Array),
        _ => Some(TypeTag::Object),
    }
}

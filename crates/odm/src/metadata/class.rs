//! Per-class mapping descriptors.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::MetadataError;
use crate::metadata::property::PropertyDescriptor;

/// Index configuration of a mapped class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index name.
    pub name: String,

    /// Index settings, sent verbatim on creation.
    #[serde(default = "default_settings")]
    pub settings: JsonValue,

    /// Optional alias attached after creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

fn default_settings() -> JsonValue {
    JsonValue::Object(serde_json::Map::new())
}

impl IndexConfig {
    /// Creates an index config with empty settings and no alias.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: default_settings(),
            alias: None,
        }
    }

    /// Sets the alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets the settings.
    pub fn with_settings(mut self, settings: JsonValue) -> Self {
        self.settings = settings;
        self
    }
}

/// All mapping metadata of one class.
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    class: String,
    properties: Vec<PropertyDescriptor>,
    index: Option<IndexConfig>,
    custom_repository_name: Option<String>,
}

impl ClassDescriptor {
    /// Creates an empty descriptor.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            properties: Vec::new(),
            index: None,
            custom_repository_name: None,
        }
    }

    /// Owning class.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Property descriptors in declaration order.
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Looks up a descriptor by exposed field name.
    pub fn property(&self, field_name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.field_name() == field_name)
    }

    /// Adds a descriptor. A descriptor with the same exposed field name
    /// replaces the existing one at its position.
    pub fn add_property(&mut self, property: PropertyDescriptor) {
        match self
            .properties
            .iter_mut()
            .find(|p| p.field_name() == property.field_name())
        {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
    }

    /// Index configuration, if any.
    pub fn index(&self) -> Option<&IndexConfig> {
        self.index.as_ref()
    }

    /// Index configuration, failing when absent.
    pub fn require_index(&self) -> Result<&IndexConfig, MetadataError> {
        self.index
            .as_ref()
            .ok_or_else(|| MetadataError::MissingIndexConfig {
                class: self.class.clone(),
            })
    }

    /// Sets the index configuration.
    pub fn set_index(&mut self, index: Option<IndexConfig>) {
        self.index = index;
    }

    /// Name of the bound custom repository.
    pub fn custom_repository_name(&self) -> Option<&str> {
        self.custom_repository_name.as_deref()
    }

    /// Sets the custom repository name.
    pub fn set_custom_repository_name(&mut self, name: Option<String>) {
        self.custom_repository_name = name;
    }

    /// Merges a more derived descriptor into this one, keeping this
    /// descriptor's class identity.
    ///
    /// Properties of `other` replace same-named fields; index and custom
    /// repository are taken from `other` when it sets them.
    pub fn merge(&mut self, other: ClassDescriptor) {
        for property in other.properties {
            self.add_property(property);
        }
        if other.index.is_some() {
            self.index = other.index;
        }
        if other.custom_repository_name.is_some() {
            self.custom_repository_name = other.custom_repository_name;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{ClassShape, Reflect, Visibility};
    use crate::value::Value;
    use std::sync::Arc;

    #[derive(Debug, Clone, Default)]
    struct Pair {
        left: i64,
        right: i64,
    }

    impl Reflect for Pair {
        const CLASS: &'static str = "geo::Pair";

        fn shape() -> ClassShape {
            ClassShape::builder::<Self>()
                .property(
                    "left",
                    Visibility::Public,
                    |p| Value::from(p.left),
                    |p, v| {
                        p.left = v.into_i64()?;
                        Ok(())
                    },
                )
                .property(
                    "right",
                    Visibility::Public,
                    |p| Value::from(p.right),
                    |p, v| {
                        p.right = v.into_i64()?;
                        Ok(())
                    },
                )
                .build()
        }
    }

    #[test]
    fn test_duplicate_field_replaces_in_place() {
        let shape = Arc::new(Pair::shape());
        let mut descriptor = ClassDescriptor::new(Pair::CLASS);
        descriptor.add_property(PropertyDescriptor::new(shape.clone(), "left"));
        descriptor.add_property(PropertyDescriptor::new(shape.clone(), "right"));

        let mut renamed = PropertyDescriptor::new(shape, "right");
        renamed.set_field_name(Some("left".to_string()));
        descriptor.add_property(renamed);

        assert_eq!(descriptor.properties().len(), 2);
        assert_eq!(descriptor.properties()[0].name(), "right");
        assert_eq!(descriptor.properties()[1].name(), "right");
        assert_eq!(descriptor.properties()[1].field_name(), "right");
    }

    #[test]
    fn test_require_index() {
        let mut descriptor = ClassDescriptor::new(Pair::CLASS);
        let err = descriptor.require_index().unwrap_err();
        assert!(matches!(err, MetadataError::MissingIndexConfig { .. }));

        descriptor.set_index(Some(IndexConfig::new("pairs").with_alias("pair_alias")));
        assert_eq!(descriptor.require_index().unwrap().name, "pairs");
    }

    #[test]
    fn test_merge_prefers_derived() {
        let shape = Arc::new(Pair::shape());
        let mut base = ClassDescriptor::new(Pair::CLASS);
        base.set_index(Some(IndexConfig::new("base")));
        base.set_custom_repository_name(Some("BaseRepository".to_string()));
        base.add_property(PropertyDescriptor::new(shape.clone(), "left"));

        let mut derived = ClassDescriptor::new(Pair::CLASS);
        let mut left = PropertyDescriptor::new(shape, "left");
        left.set_mapping(Some(serde_json::json!({"type": "long"})));
        derived.add_property(left);

        base.merge(derived);
        assert_eq!(base.class(), Pair::CLASS);
        assert_eq!(base.index().map(|i| i.name.as_str()), Some("base"));
        assert_eq!(base.custom_repository_name(), Some("BaseRepository"));
        assert!(base.property("left").and_then(|p| p.mapping()).is_some());
    }

    #[test]
    fn test_index_config_deserialize_defaults() {
        let config: IndexConfig = serde_json::from_value(serde_json::json!({"name": "people"}))
            .unwrap();
        assert_eq!(config.settings, serde_json::json!({}));
        assert_eq!(config.alias, None);
    }
}

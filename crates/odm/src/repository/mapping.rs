//! Index lifecycle: creation, field mapping and drift detection.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value as JsonValue};

use crate::core::SearchClient;
use crate::error::{IndexError, MetadataError, OdmResult, StoreError};
use crate::metadata::{ClassDescriptor, IndexConfig, MetadataFactory, TypeTag};
use crate::repository::index::Index;

const TEST_SUFFIX: &str = "_test";

/// Resolves the index of each entity class, creating it on first use.
///
/// An index that does not exist yet is created with the configured settings,
/// gets its alias attached and its field mapping defined. An index that
/// already exists must carry the configured mapping; any difference fails
/// with [`IndexError::UnsupportedMigration`].
pub struct IndexMapping {
    client: Arc<dyn SearchClient>,
    metadata: Arc<MetadataFactory>,
    test_environment: bool,
    indices: RwLock<HashMap<String, Index>>,
}

impl fmt::Debug for IndexMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexMapping")
            .field("client", &self.client.client_name())
            .field("test_environment", &self.test_environment)
            .field("resolved", &self.indices.read().len())
            .finish_non_exhaustive()
    }
}

impl IndexMapping {
    /// Creates an index mapping over `client`.
    ///
    /// With `test_environment`, `_test` is appended to index names and aliases.
    pub fn new(
        client: Arc<dyn SearchClient>,
        metadata: Arc<MetadataFactory>,
        test_environment: bool,
    ) -> Self {
        Self {
            client,
            metadata,
            test_environment,
            indices: RwLock::new(HashMap::new()),
        }
    }

    /// The store client.
    pub fn client(&self) -> &Arc<dyn SearchClient> {
        &self.client
    }

    /// The metadata factory.
    pub fn metadata_factory(&self) -> &Arc<MetadataFactory> {
        &self.metadata
    }

    /// Whether index names carry the test suffix.
    pub fn is_test_environment(&self) -> bool {
        self.test_environment
    }

    /// Returns the index of `class`, creating and mapping it when missing.
    pub async fn get_index(&self, class: &str) -> OdmResult<Index> {
        let cached = self.indices.read().get(class).cloned();
        if let Some(index) = cached {
            return Ok(index);
        }

        let metadata = self.metadata.require_metadata_for_class(class)?;
        let config = self.index_config(&metadata)?;
        let mapping = self.extract_mapping_config(&metadata)?;

        let index = Index::new(self.client.clone(), config.name.clone());

        if index.exists().await? {
            let remote = index.get_mapping().await?;
            let diff = mapping_difference(&mapping, &remote);
            if !diff.is_empty() {
                return Err(IndexError::UnsupportedMigration {
                    index: config.name,
                    diff: JsonValue::Object(diff).to_string(),
                }
                .into());
            }
            tracing::debug!(class = %class, index = %config.name, "Index mapping is up to date");
        } else {
            self.create_index(&index, &config).await?;
            self.define_mapping(&index, &mapping).await?;
        }

        self.indices
            .write()
            .entry(class.to_string())
            .or_insert_with(|| index.clone());

        Ok(index)
    }

    /// Returns the alias index of `class`, `None` when no alias is configured.
    pub async fn get_index_alias(&self, class: &str) -> OdmResult<Option<Index>> {
        let metadata = self.metadata.require_metadata_for_class(class)?;
        let config = self.index_config(&metadata)?;

        Ok(config
            .alias
            .map(|alias| Index::new(self.client.clone(), alias)))
    }

    /// Index configuration of `metadata` with the environment suffix applied.
    fn index_config(&self, metadata: &ClassDescriptor) -> Result<IndexConfig, MetadataError> {
        let mut config = metadata.require_index()?.clone();
        if self.test_environment {
            config.name.push_str(TEST_SUFFIX);
            if let Some(alias) = config.alias.as_mut() {
                alias.push_str(TEST_SUFFIX);
            }
        }
        Ok(config)
    }

    async fn create_index(&self, index: &Index, config: &IndexConfig) -> OdmResult<()> {
        let response = index.create(&config.settings).await?;
        if !response.is_ok() {
            return Err(
                StoreError::request("create index", index.name(), response.error_message())
                    .into(),
            );
        }
        tracing::info!(index = %index.name(), "Created index");

        let Some(alias) = config.alias.as_deref() else {
            return Ok(());
        };

        let response = index.add_alias(alias).await?;
        if !response.is_ok() {
            return Err(
                StoreError::request("add alias", index.name(), response.error_message()).into(),
            );
        }
        tracing::info!(index = %index.name(), alias = %alias, "Attached index alias");

        Ok(())
    }

    async fn define_mapping(&self, index: &Index, mapping: &JsonValue) -> OdmResult<()> {
        let response = index.set_mapping(mapping).await?;
        if !response.is_ok() {
            return Err(
                StoreError::request("put mapping", index.name(), response.error_message())
                    .into(),
            );
        }
        tracing::info!(
            index = %index.name(),
            fields = mapping.as_object().map(Map::len).unwrap_or(0),
            "Defined index mapping"
        );
        Ok(())
    }

    /// Flattens the properties of `metadata` into field mapping declarations.
    ///
    /// Object properties become `{"type": "object", "properties": {...}}`
    /// built from their class metadata; other properties without a mapping are
    /// left out.
    pub fn extract_mapping_config(&self, metadata: &ClassDescriptor) -> OdmResult<JsonValue> {
        let mut path = Vec::new();
        self.extract_properties(metadata, &mut path)
            .map(JsonValue::Object)
    }

    fn extract_properties(
        &self,
        metadata: &ClassDescriptor,
        path: &mut Vec<String>,
    ) -> OdmResult<Map<String, JsonValue>> {
        if path.iter().any(|class| class == metadata.class()) {
            return Err(MetadataError::config(
                metadata.class(),
                format!(
                    "object properties form a cycle: {} -> {}",
                    path.join(" -> "),
                    metadata.class()
                ),
            )
            .into());
        }
        path.push(metadata.class().to_string());

        let mut fields = Map::new();
        for property in metadata.properties() {
            if property.type_tag() == Some(TypeTag::Object) {
                let class = property.type_class().ok_or_else(|| {
                    MetadataError::config(
                        property.class(),
                        format!("object property {} has no type_class", property.name()),
                    )
                })?;
                let sub_metadata = self.metadata.require_metadata_for_class(class)?;
                let properties = self.extract_properties(&sub_metadata, path)?;

                let mut field = Map::new();
                field.insert("type".to_string(), JsonValue::from("object"));
                field.insert("properties".to_string(), JsonValue::Object(properties));
                fields.insert(property.field_name().to_string(), JsonValue::Object(field));
                continue;
            }

            let Some(mapping) = property.mapping() else {
                continue;
            };
            fields.insert(property.field_name().to_string(), mapping.clone());
        }

        path.pop();
        Ok(fields)
    }
}

/// Keys of `local` that are missing from or differ in `remote`.
///
/// Objects and arrays are compared recursively, arrays by position. Values
/// equal to `"object"` never count as different, since the store omits the
/// type of object fields.
pub fn mapping_difference(local: &JsonValue, remote: &JsonValue) -> Map<String, JsonValue> {
    let entries: Vec<(String, &JsonValue)> = match local {
        JsonValue::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        JsonValue::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    };

    let mut difference = Map::new();
    for (key, value) in entries {
        if value.as_str() == Some("object") {
            continue;
        }

        let Some(remote_value) = lookup(remote, &key) else {
            difference.insert(key, value.clone());
            continue;
        };

        match value {
            JsonValue::Object(_) | JsonValue::Array(_) => {
                if !is_container(remote_value) {
                    difference.insert(key, value.clone());
                    continue;
                }
                let nested = mapping_difference(value, remote_value);
                if !nested.is_empty() {
                    difference.insert(key, JsonValue::Object(nested));
                }
            }
            _ if value != remote_value => {
                difference.insert(key, value.clone());
            }
            _ => {}
        }
    }
    difference
}

fn lookup<'a>(container: &'a JsonValue, key: &str) -> Option<&'a JsonValue> {
    match container {
        JsonValue::Object(map) => map.get(key),
        JsonValue::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn is_container(value: &JsonValue) -> bool {
    matches!(value, JsonValue::Object(_) | JsonValue::Array(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identical_mappings_have_no_difference() {
        let local = json!({"name": {"type": "keyword"}, "age": {"type": "integer"}});
        assert!(mapping_difference(&local, &local).is_empty());
    }

    #[test]
    fn test_equal_arrays_have_no_difference() {
        let local = json!({"test": ["hello"]});
        let remote = json!({"test": ["hello"]});
        assert!(mapping_difference(&local, &remote).is_empty());
    }

    #[test]
    fn test_missing_scalar_is_reported() {
        let local = json!({"test": ["hello"], "not_here": "here_i_am"});
        let remote = json!({"test": ["hello"]});
        let diff = mapping_difference(&local, &remote);
        assert_eq!(JsonValue::Object(diff), json!({"not_here": "here_i_am"}));
    }

    #[test]
    fn test_missing_and_changed_fields() {
        let local = json!({
            "name": {"type": "keyword"},
            "age": {"type": "integer"},
            "bio": {"type": "text"}
        });
        let remote = json!({
            "name": {"type": "text"},
            "age": {"type": "integer"}
        });

        let diff = mapping_difference(&local, &remote);
        assert_eq!(
            JsonValue::Object(diff),
            json!({"name": {"type": "keyword"}, "bio": {"type": "text"}})
        );
    }

    #[test]
    fn test_object_type_is_ignored() {
        let local = json!({
            "child": {"type": "object", "properties": {"name": {"type": "keyword"}}}
        });
        let remote = json!({
            "child": {"properties": {"name": {"type": "keyword"}}}
        });
        assert!(mapping_difference(&local, &remote).is_empty());
    }

    #[test]
    fn test_order_is_ignored_and_extra_remote_fields_allowed() {
        let local = json!({"a": {"type": "keyword"}, "b": {"type": "long"}});
        let remote = json!({"b": {"type": "long"}, "c": {"type": "date"}, "a": {"type": "keyword"}});
        assert!(mapping_difference(&local, &remote).is_empty());
    }

    #[test]
    fn test_arrays_compare_by_position() {
        let local = json!({"name": {"copy_to": ["all", "search"]}});
        let remote = json!({"name": {"copy_to": ["search", "all"]}});
        let diff = mapping_difference(&local, &remote);
        assert_eq!(
            JsonValue::Object(diff),
            json!({"name": {"copy_to": {"0": "all", "1": "search"}}})
        );
    }

    #[test]
    fn test_scalar_remote_for_nested_local() {
        let local = json!({"name": {"fields": {"raw": {"type": "keyword"}}}});
        let remote = json!({"name": {"fields": "raw"}});
        let diff = mapping_difference(&local, &remote);
        assert!(diff.contains_key("name"));
    }
}

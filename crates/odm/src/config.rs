//! Configuration of the mapper stack.
//!
//! [`OdmConfig`] collects where class metadata lives, whether indices use
//! the test suffix, the navigation depth limit and (with the
//! `elasticsearch` feature) how to reach the cluster. It deserializes from
//! YAML or JSON:
//!
//! ```yaml
//! metadata:
//!   - prefix: "app::model"
//!     directory: "config/odm"
//! test_environment: false
//! max_depth: 64
//! elasticsearch:
//!   nodes: ["http://localhost:9200"]
//!   request_timeout_ms: 30000
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[cfg(feature = "elasticsearch")]
use crate::backends::elasticsearch::ElasticsearchConfig;
use crate::core::SearchClient;
use crate::error::{MetadataError, OdmResult};
use crate::metadata::{FileLocator, MetadataFactory, YamlDriver};
use crate::reflect::TypeRegistry;
use crate::repository::{IndexMapping, RepositoryFactory};
use crate::transformer::{DEFAULT_MAX_DEPTH, DataNavigator, ElasticsearchTransformer};

/// A directory of metadata files for one namespace prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDirectory {
    /// Namespace prefix of the classes described in the directory; empty
    /// matches every class.
    #[serde(default)]
    pub prefix: String,
    /// Directory holding `<ShortClassPath>.yaml` files.
    pub directory: PathBuf,
}

/// Configuration of the whole mapper stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdmConfig {
    /// Metadata directories, searched in order.
    #[serde(default)]
    pub metadata: Vec<MetadataDirectory>,

    /// Appends `_test` to index names and aliases (default: false).
    #[serde(default)]
    pub test_environment: bool,

    /// Maximum nesting depth of transformed values (default: 64).
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Elasticsearch connection settings.
    #[cfg(feature = "elasticsearch")]
    #[serde(default)]
    pub elasticsearch: ElasticsearchConfig,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for OdmConfig {
    fn default() -> Self {
        Self {
            metadata: Vec::new(),
            test_environment: false,
            max_depth: default_max_depth(),
            #[cfg(feature = "elasticsearch")]
            elasticsearch: ElasticsearchConfig::default(),
        }
    }
}

impl OdmConfig {
    /// Parses a YAML document.
    pub fn from_yaml_str(content: &str) -> OdmResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parses a JSON document.
    pub fn from_json_str(content: &str) -> OdmResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Reads a configuration file; `.json` files are parsed as JSON, anything
    /// else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> OdmResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        tracing::debug!("Loading mapper configuration from {}", path.display());

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Adds a metadata directory.
    pub fn with_metadata_directory(
        mut self,
        prefix: impl Into<String>,
        directory: impl Into<PathBuf>,
    ) -> Self {
        self.metadata.push(MetadataDirectory {
            prefix: prefix.into(),
            directory: directory.into(),
        });
        self
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.max_depth == 0 {
            errors.push("Max depth cannot be 0".to_string());
        }

        for entry in &self.metadata {
            if entry.directory.as_os_str().is_empty() {
                errors.push(format!(
                    "Metadata directory for prefix '{}' cannot be empty",
                    entry.prefix
                ));
            }
        }

        self.validate_backend(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    #[cfg(feature = "elasticsearch")]
    fn validate_backend(&self, errors: &mut Vec<String>) {
        if self.elasticsearch.nodes.is_empty() {
            errors.push("At least one Elasticsearch node is required".to_string());
        }
    }

    #[cfg(not(feature = "elasticsearch"))]
    fn validate_backend(&self, _errors: &mut Vec<String>) {}

    /// Creates a configuration suitable for testing: test index suffix on,
    /// metadata read from `directory` for every class.
    pub fn for_testing(directory: impl Into<PathBuf>) -> Self {
        Self {
            test_environment: true,
            ..Self::default()
        }
        .with_metadata_directory("", directory)
    }

    /// File locator over the configured metadata directories.
    pub fn file_locator(&self) -> FileLocator {
        FileLocator::from_directories(
            self.metadata
                .iter()
                .map(|entry| (entry.prefix.clone(), entry.directory.clone())),
        )
    }

    /// Metadata factory reading YAML files from the configured directories.
    pub fn metadata_factory(&self, registry: Arc<TypeRegistry>) -> Arc<MetadataFactory> {
        Arc::new(MetadataFactory::new(
            registry,
            YamlDriver::new(self.file_locator()),
        ))
    }

    /// Navigator honouring the configured depth limit.
    pub fn navigator(&self, metadata: Arc<MetadataFactory>) -> DataNavigator {
        DataNavigator::new(metadata).with_max_depth(self.max_depth)
    }

    /// Elasticsearch transformer over a configured navigator.
    pub fn transformer(&self, metadata: Arc<MetadataFactory>) -> ElasticsearchTransformer {
        ElasticsearchTransformer::new(self.navigator(metadata))
    }

    /// Index mapping honouring the test environment flag.
    pub fn index_mapping(
        &self,
        client: Arc<dyn SearchClient>,
        metadata: Arc<MetadataFactory>,
    ) -> IndexMapping {
        IndexMapping::new(client, metadata, self.test_environment)
    }

    /// Wires a repository factory over `client`.
    ///
    /// Fails when the configuration does not validate.
    pub fn repository_factory(
        &self,
        client: Arc<dyn SearchClient>,
        registry: Arc<TypeRegistry>,
    ) -> OdmResult<RepositoryFactory> {
        self.validate()
            .map_err(|errors| MetadataError::config("<config>", errors.join("; ")))?;

        let metadata = self.metadata_factory(registry);
        let transformer = Arc::new(self.transformer(metadata.clone()));
        let index_mapping = Arc::new(self.index_mapping(client, metadata.clone()));

        Ok(RepositoryFactory::new(index_mapping, transformer, metadata))
    }
}

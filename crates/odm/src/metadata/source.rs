//! Configuration sources for the YAML metadata driver.
//!
//! A source maps a class identity to the parsed configuration document that
//! describes it. Class identities use `::` as the namespace separator.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;

use crate::error::{MetadataError, OdmResult};

/// A parsed configuration document.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    /// Where the document came from, for error messages.
    pub origin: String,
    /// Document root; a map keyed by class identity.
    pub tree: JsonValue,
}

/// Locates the configuration document of a class.
pub trait ConfigSource: Send + Sync + fmt::Debug {
    /// Loads the document describing `class`, or `None` when there is none.
    fn load(&self, class: &str) -> OdmResult<Option<ConfigDocument>>;
}

/// Reads `<ShortPath>.yaml` files from one directory per namespace prefix.
///
/// For prefix `app::model` mapped to `config/`, class `app::model::Person`
/// resolves to `config/Person.yaml` and `app::model::billing::Invoice` to
/// `config/billing.Invoice.yaml`. An empty prefix matches every class.
#[derive(Debug, Clone, Default)]
pub struct FileLocator {
    directories: Vec<(String, PathBuf)>,
}

impl FileLocator {
    /// Creates a locator without directories.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a namespace prefix → directory entry.
    pub fn with_directory(mut self, prefix: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        self.directories.push((prefix.into(), directory.into()));
        self
    }

    /// Builds a locator from a prefix → directory map.
    pub fn from_directories<I, K, V>(directories: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PathBuf>,
    {
        Self {
            directories: directories
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the path of the first existing file for `class`.
    pub fn find_file_for_class(&self, class: &str) -> Option<PathBuf> {
        self.directories.iter().find_map(|(prefix, directory)| {
            let short_path = short_path(prefix, class)?;
            let path = directory.join(format!("{}.yaml", short_path.replace("::", ".")));
            path.is_file().then_some(path)
        })
    }
}

fn short_path<'a>(prefix: &str, class: &'a str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(class);
    }
    class
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix("::"))
        .filter(|rest| !rest.is_empty())
}

impl ConfigSource for FileLocator {
    fn load(&self, class: &str) -> OdmResult<Option<ConfigDocument>> {
        let Some(path) = self.find_file_for_class(class) else {
            return Ok(None);
        };
        tracing::debug!("Loading metadata config for '{}' from {}", class, path.display());
        let content = std::fs::read_to_string(&path)?;
        let tree = parse_yaml(class, &path, &content)?;
        Ok(Some(ConfigDocument {
            origin: path.display().to_string(),
            tree,
        }))
    }
}

fn parse_yaml(class: &str, path: &Path, content: &str) -> Result<JsonValue, MetadataError> {
    serde_yaml::from_str(content).map_err(|e| {
        MetadataError::config(class, format!("cannot parse {}: {}", path.display(), e))
    })
}

/// Configuration documents held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigSource {
    documents: HashMap<String, ConfigDocument>,
}

impl InMemoryConfigSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a YAML document. Every top-level key becomes a known class.
    pub fn add_yaml(&mut self, yaml: &str) -> Result<&mut Self, MetadataError> {
        let tree: JsonValue = serde_yaml::from_str(yaml)
            .map_err(|e| MetadataError::config("<memory>", format!("cannot parse yaml: {}", e)))?;
        Ok(self.add_tree(tree))
    }

    /// Adds an already parsed document.
    pub fn add_tree(&mut self, tree: JsonValue) -> &mut Self {
        if let Some(classes) = tree.as_object() {
            for class in classes.keys() {
                self.documents.insert(
                    class.clone(),
                    ConfigDocument {
                        origin: "<memory>".to_string(),
                        tree: tree.clone(),
                    },
                );
            }
        }
        self
    }

    /// Builder-style [`InMemoryConfigSource::add_yaml`].
    pub fn with_yaml(mut self, yaml: &str) -> Result<Self, MetadataError> {
        self.add_yaml(yaml)?;
        Ok(self)
    }
}

impl ConfigSource for InMemoryConfigSource {
    fn load(&self, class: &str) -> OdmResult<Option<ConfigDocument>> {
        Ok(self.documents.get(class).cloned())
    }
}

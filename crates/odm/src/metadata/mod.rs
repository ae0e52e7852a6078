//! Class mapping metadata.
//!
//! - [`PropertyDescriptor`] / [`ClassDescriptor`] - how properties map to fields
//! - [`YamlDriver`] - builds descriptors from YAML documents
//! - [`FileLocator`] / [`InMemoryConfigSource`] - where the documents come from
//! - [`MetadataFactory`] - resolves, merges and caches descriptors per class

pub mod class;
pub mod driver;
pub mod factory;
pub mod property;
pub mod source;
pub mod types;

pub use class::{ClassDescriptor, IndexConfig};
pub use driver::{MetadataSource, YamlDriver};
pub use factory::MetadataFactory;
pub use property::PropertyDescriptor;
pub use source::{ConfigDocument, ConfigSource, FileLocator, InMemoryConfigSource};
pub use types::TypeTag;

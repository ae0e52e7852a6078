//! Error types for the object-document mapper.
//!
//! Errors are grouped by the layer that raises them: metadata resolution,
//! property access, value transformation, index lifecycle, and the external
//! document store. [`OdmError`] wraps every category.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all mapper operations.
#[derive(Error, Debug)]
pub enum OdmError {
    /// Metadata configuration errors
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Property read/write errors
    #[error(transparent)]
    Property(#[from] PropertyError),

    /// Value conversion errors
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Index lifecycle errors
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Document store errors
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised while building or resolving class metadata.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// Missing or malformed metadata configuration.
    #[error("invalid metadata config for {class}: {message}")]
    Config { class: String, message: String },

    /// The runtime class of an object has no registered metadata.
    #[error("no metadata was found for class \"{class}\", please check configuration")]
    NoMetadata { class: String },

    /// The class metadata has no index configuration.
    #[error("metadata is missing index configuration for \"{class}\"")]
    MissingIndexConfig { class: String },
}

impl MetadataError {
    pub(crate) fn config(class: impl Into<String>, message: impl Into<String>) -> Self {
        MetadataError::Config {
            class: class.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by property descriptors.
#[derive(Error, Debug)]
pub enum PropertyError {
    /// The property cannot be read or written.
    #[error("cannot access property {class}::{property}: {message}")]
    Access {
        class: String,
        property: String,
        message: String,
    },

    /// A write was attempted on a read-only (virtual) property.
    #[error("property {class}::{property} is read-only")]
    Immutable { class: String, property: String },
}

/// Errors raised while converting values.
#[derive(Error, Debug)]
pub enum TransformError {
    /// The value cannot be converted.
    #[error("transformation failed: {message}")]
    Failed { message: String },

    /// The object graph is nested deeper than the navigator allows.
    #[error("maximum navigation depth of {max_depth} exceeded")]
    DepthExceeded { max_depth: usize },
}

impl TransformError {
    pub(crate) fn failed(message: impl Into<String>) -> Self {
        TransformError::Failed {
            message: message.into(),
        }
    }
}

/// Errors related to index lifecycle management.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The live index mapping differs from the configured mapping.
    #[error("index {index} mapping differs from configuration ({diff}); dynamic updates to index mapping are not supported")]
    UnsupportedMigration { index: String, diff: String },
}

/// Errors originating from the document store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store rejected or failed a request.
    #[error("{operation} failed on {index}: {message}")]
    Request {
        operation: String,
        index: String,
        message: String,
    },

    /// The store is unavailable.
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// Connection to the store could not be configured.
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Reading local configuration failed.
    #[error("io error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    pub(crate) fn request(
        operation: impl Into<String>,
        index: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        StoreError::Request {
            operation: operation.into(),
            index: index.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for mapper operations.
pub type OdmResult<T> = Result<T, OdmError>;

// Implement conversions from common error types

impl From<serde_json::Error> for OdmError {
    fn from(err: serde_json::Error) -> Self {
        OdmError::Store(StoreError::Serialization {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for OdmError {
    fn from(err: serde_yaml::Error) -> Self {
        OdmError::Store(StoreError::Serialization {
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<std::io::Error> for OdmError {
    fn from(err: std::io::Error) -> Self {
        OdmError::Store(err.into())
    }
}

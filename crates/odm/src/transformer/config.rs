//! Per-step type configuration handed to the visitors.

use crate::metadata::TypeTag;
use crate::reflect::Entity;

/// Type information for a single navigation step.
///
/// Built fresh for every value visited; `populate` is only meaningful when
/// hydrating objects.
#[derive(Debug, Clone)]
pub struct TypeConfig {
    /// Semantic type of the value.
    pub type_tag: TypeTag,
    /// Class of the object (or of array elements).
    pub class: Option<String>,
    /// Existing object to fill in place instead of creating a new one.
    pub populate: Option<Box<dyn Entity>>,
}

impl TypeConfig {
    /// Creates a config for `type_tag`.
    pub fn new(type_tag: TypeTag) -> Self {
        Self {
            type_tag,
            class: None,
            populate: None,
        }
    }

    /// Creates an object config for `class`.
    pub fn object(class: impl Into<String>) -> Self {
        Self::new(TypeTag::Object).with_class(class)
    }

    /// Sets the class.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Sets an optional class.
    pub fn with_opt_class(mut self, class: Option<impl Into<String>>) -> Self {
        self.class = class.map(Into::into);
        self
    }

    /// Sets the object to populate.
    pub fn with_populate(mut self, object: Box<dyn Entity>) -> Self {
        self.populate = Some(object);
        self
    }
}

//! Per-property mapping descriptors.

use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::error::{MetadataError, OdmResult, PropertyError};
use crate::metadata::types::TypeTag;
use crate::reflect::{ClassShape, Entity, Reader, Writer};
use crate::value::Value;

/// An accessor method bound to a descriptor.
#[derive(Clone)]
struct Bound<F> {
    name: String,
    call: F,
}

/// Describes how one property (or virtual getter) maps to a document field.
#[derive(Clone)]
pub struct PropertyDescriptor {
    shape: Arc<ClassShape>,
    class: String,
    name: String,
    field_name: Option<String>,
    type_tag: Option<TypeTag>,
    type_class: Option<String>,
    getter: Option<Bound<Reader>>,
    setter: Option<Bound<Writer>>,
    field_reader: Option<Reader>,
    field_writer: Option<Writer>,
    mapping: Option<JsonValue>,
    virtual_method: Option<String>,
}

impl PropertyDescriptor {
    /// Creates a descriptor for `property` of the class described by `shape`.
    ///
    /// The raw field accessors are bound when the shape declares the property.
    pub fn new(shape: Arc<ClassShape>, property: &str) -> Self {
        let (field_reader, field_writer) = shape
            .property(property)
            .map(|p| (p.reader().cloned(), p.writer().cloned()))
            .unwrap_or((None, None));

        Self {
            class: shape.name().to_string(),
            shape,
            name: property.to_string(),
            field_name: None,
            type_tag: None,
            type_class: None,
            getter: None,
            setter: None,
            field_reader,
            field_writer,
            mapping: None,
            virtual_method: None,
        }
    }

    /// Creates a read-only descriptor backed by a getter method.
    ///
    /// A leading `get` is stripped from the method name and the next
    /// character lower-cased to form the property name (`getUnknownChildren`
    /// becomes `unknownChildren`; `divorceFee` is kept as is).
    pub fn virtual_property(shape: Arc<ClassShape>, method: &str) -> Self {
        let name = virtual_field_name(method);
        let getter = shape
            .method(method)
            .and_then(|m| m.as_getter())
            .map(|reader| Bound {
                name: method.to_string(),
                call: reader.clone(),
            });

        Self {
            class: shape.name().to_string(),
            shape,
            name,
            field_name: None,
            type_tag: None,
            type_class: None,
            getter,
            setter: None,
            field_reader: None,
            field_writer: None,
            mapping: None,
            virtual_method: Some(method.to_string()),
        }
    }

    /// Owning class.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Source property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exposed document field name; defaults to the property name.
    pub fn field_name(&self) -> &str {
        self.field_name.as_deref().unwrap_or(&self.name)
    }

    /// Overrides the exposed field name.
    pub fn set_field_name(&mut self, field_name: Option<String>) {
        self.field_name = field_name;
    }

    /// Semantic type, if known.
    pub fn type_tag(&self) -> Option<TypeTag> {
        self.type_tag
    }

    /// Sets the semantic type.
    pub fn set_type(&mut self, type_tag: Option<TypeTag>) {
        self.type_tag = type_tag;
    }

    /// Object sub-type (class identity).
    pub fn type_class(&self) -> Option<&str> {
        self.type_class.as_deref()
    }

    /// Sets the object sub-type.
    pub fn set_type_class(&mut self, type_class: Option<String>) {
        self.type_class = type_class;
    }

    /// Opaque index mapping settings.
    pub fn mapping(&self) -> Option<&JsonValue> {
        self.mapping.as_ref()
    }

    /// Sets the index mapping settings.
    pub fn set_mapping(&mut self, mapping: Option<JsonValue>) {
        self.mapping = mapping;
    }

    /// Returns true for virtual (method-backed) descriptors.
    pub fn is_read_only(&self) -> bool {
        self.virtual_method.is_some()
    }

    /// Name of the bound getter method.
    pub fn getter_name(&self) -> Option<&str> {
        self.getter.as_ref().map(|g| g.name.as_str())
    }

    /// Name of the bound setter method.
    pub fn setter_name(&self) -> Option<&str> {
        self.setter.as_ref().map(|s| s.name.as_str())
    }

    /// Binds the conventional accessors when they exist and are public.
    ///
    /// Setter: `set<Name>`. Getter: `get<Name>`, then `is<Name>`, then
    /// `has<Name>`. Methods of the wrong kind are not bound.
    pub fn resolve_default_accessors(&mut self) {
        if self.is_read_only() {
            return;
        }
        let cap = ucfirst(&self.name);

        let setter_name = format!("set{}", cap);
        if let Some(writer) = self
            .shape
            .method(&setter_name)
            .filter(|m| m.visibility().is_public())
            .and_then(|m| m.as_setter())
        {
            self.setter = Some(Bound {
                name: setter_name,
                call: writer.clone(),
            });
        }

        for prefix in ["get", "is", "has"] {
            let getter_name = format!("{}{}", prefix, cap);
            if let Some(reader) = self
                .shape
                .method(&getter_name)
                .filter(|m| m.visibility().is_public())
                .and_then(|m| m.as_getter())
            {
                self.getter = Some(Bound {
                    name: getter_name,
                    call: reader.clone(),
                });
                return;
            }
        }
    }

    /// Binds an explicitly configured getter. Ignored on virtual descriptors.
    pub fn set_getter_accessor(&mut self, method: &str) -> Result<(), MetadataError> {
        if self.is_read_only() {
            return Ok(());
        }
        let reader = self
            .shape
            .method(method)
            .ok_or_else(|| missing_method(&self.class, method))?
            .as_getter()
            .ok_or_else(|| {
                MetadataError::config(&self.class, format!("method {} is not a getter", method))
            })?;
        self.getter = Some(Bound {
            name: method.to_string(),
            call: reader.clone(),
        });
        Ok(())
    }

    /// Binds an explicitly configured setter. Ignored on virtual descriptors.
    pub fn set_setter_accessor(&mut self, method: &str) -> Result<(), MetadataError> {
        if self.is_read_only() {
            return Ok(());
        }
        let writer = self
            .shape
            .method(method)
            .ok_or_else(|| missing_method(&self.class, method))?
            .as_setter()
            .ok_or_else(|| {
                MetadataError::config(&self.class, format!("method {} is not a setter", method))
            })?;
        self.setter = Some(Bound {
            name: method.to_string(),
            call: writer.clone(),
        });
        Ok(())
    }

    /// Reads the property from `object`.
    pub fn get_value(&self, object: &dyn Entity) -> OdmResult<Value> {
        self.check_instance(object.class_name())?;

        if let Some(method) = &self.virtual_method {
            let getter = self
                .getter
                .as_ref()
                .ok_or_else(|| self.access_error(format!("object has no method named {}", method)))?;
            return (getter.call)(object);
        }

        if let Some(getter) = &self.getter {
            return (getter.call)(object);
        }

        match &self.field_reader {
            Some(reader) => reader(object),
            None => Err(self.access_error("no getter is bound and the field is not accessible").into()),
        }
    }

    /// Writes `value` into the property of `object`.
    pub fn set_value(&self, object: &mut dyn Entity, value: Value) -> OdmResult<()> {
        if self.is_read_only() {
            return Err(PropertyError::Immutable {
                class: self.class.clone(),
                property: self.name.clone(),
            }
            .into());
        }
        self.check_instance(object.class_name())?;

        if let Some(setter) = &self.setter {
            return (setter.call)(object, value);
        }

        match &self.field_writer {
            Some(writer) => writer(object, value),
            None => Err(self.access_error("no setter is bound and the field is not accessible").into()),
        }
    }

    fn check_instance(&self, actual: &str) -> Result<(), PropertyError> {
        if actual == self.class {
            return Ok(());
        }
        Err(self.access_error(format!(
            "object of class {} is not an instance of {}",
            actual, self.class
        )))
    }

    fn access_error(&self, message: impl Into<String>) -> PropertyError {
        PropertyError::Access {
            class: self.class.clone(),
            property: self.name.clone(),
            message: message.into(),
        }
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("class", &self.class)
            .field("name", &self.name)
            .field("field_name", &self.field_name)
            .field("type_tag", &self.type_tag)
            .field("type_class", &self.type_class)
            .field("getter", &self.getter_name())
            .field("setter", &self.setter_name())
            .field("mapping", &self.mapping)
            .field("read_only", &self.is_read_only())
            .finish()
    }
}

fn missing_method(class: &str, method: &str) -> MetadataError {
    MetadataError::config(class, format!("the method {} was not found in class {}", method, class))
}

fn ucfirst(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn virtual_field_name(method: &str) -> String {
    match method.strip_prefix("get") {
        Some(rest) => {
            let mut chars = rest.chars();
            match chars.next() {
                Some(first) => first.to_lowercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        None => method.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ucfirst() {
        assert_eq!(ucfirst("wifeName"), "WifeName");
        assert_eq!(ucfirst(""), "");
    }

    #[test]
    fn test_virtual_field_name() {
        assert_eq!(virtual_field_name("getUnknownChildren"), "unknownChildren");
        assert_eq!(virtual_field_name("divorceFee"), "divorceFee");
        assert_eq!(virtual_field_name("get"), "");
    }
}

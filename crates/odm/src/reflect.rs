//! Registered class shapes.
//!
//! Rust has no runtime reflection, so every mapped domain type describes its
//! own shape once at start-up: the properties it declares (with raw field
//! accessors), the accessor methods it exposes, its parent class, and how to
//! create a blank instance. Metadata drivers and property descriptors bind to
//! these callables once; nothing is looked up by name on the hot path.
//!
//! ```
//! use helios_odm::reflect::{ClassShape, Reflect, Visibility};
//! use helios_odm::Value;
//!
//! #[derive(Debug, Clone, Default)]
//! struct Person {
//!     name: String,
//! }
//!
//! impl Reflect for Person {
//!     const CLASS: &'static str = "app::Person";
//!
//!     fn shape() -> ClassShape {
//!         ClassShape::builder::<Self>()
//!             .property(
//!                 "name",
//!                 Visibility::Private,
//!                 |p| Value::from(p.name.clone()),
//!                 |p, v| {
//!                     p.name = v.into_string()?;
//!                     Ok(())
//!                 },
//!             )
//!             .doc("/** @var string */")
//!             .getter("getName", Visibility::Public, |p| Value::from(p.name.clone()))
//!             .build()
//!     }
//! }
//!
//! let shape = Person::shape();
//! assert_eq!(shape.name(), "app::Person");
//! assert!(shape.has_method("getName"));
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{OdmResult, PropertyError, TransformError};
use crate::value::Value;

/// A mapped domain object, usable behind `dyn`.
///
/// Implemented for every [`Reflect`] type by a blanket impl.
pub trait Entity: Any + Send + Sync + fmt::Debug {
    /// The runtime class identity of the object.
    fn class_name(&self) -> &str;

    /// Clones the object into a new box.
    fn clone_entity(&self) -> Box<dyn Entity>;

    /// Upcasts to `Any` for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable variant of [`Entity::as_any`].
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Converts the box into `Box<dyn Any>`.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Describes a domain type to the mapper.
pub trait Reflect: Clone + Default + fmt::Debug + Send + Sync + 'static {
    /// Fully qualified class identity; configuration is keyed by it.
    const CLASS: &'static str;

    /// The reflective shape of the type.
    fn shape() -> ClassShape;
}

impl<T: Reflect> Entity for T {
    fn class_name(&self) -> &str {
        T::CLASS
    }

    fn clone_entity(&self) -> Box<dyn Entity> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl Clone for Box<dyn Entity> {
    fn clone(&self) -> Self {
        self.clone_entity()
    }
}

/// Reads a value from an object.
pub type Reader = Arc<dyn Fn(&dyn Entity) -> OdmResult<Value> + Send + Sync>;

/// Writes a value into an object.
pub type Writer = Arc<dyn Fn(&mut dyn Entity, Value) -> OdmResult<()> + Send + Sync>;

type Constructor = Arc<dyn Fn() -> Box<dyn Entity> + Send + Sync>;

/// Member visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Accessible from anywhere.
    Public,
    /// Accessible from the class and its descendants.
    Protected,
    /// Accessible from the declaring class only.
    Private,
}

impl Visibility {
    /// Returns true for public members.
    pub fn is_public(&self) -> bool {
        *self == Visibility::Public
    }
}

/// A property declared on (or inherited by) a class.
#[derive(Clone)]
pub struct PropertyShape {
    name: String,
    declaring_class: String,
    visibility: Visibility,
    doc_comment: Option<String>,
    reader: Option<Reader>,
    writer: Option<Writer>,
}

impl PropertyShape {
    /// Property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class that declares the property.
    pub fn declaring_class(&self) -> &str {
        &self.declaring_class
    }

    /// Property visibility.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Documentation comment attached to the property.
    pub fn doc_comment(&self) -> Option<&str> {
        self.doc_comment.as_deref()
    }

    /// Raw field reader, when the field is reachable.
    pub fn reader(&self) -> Option<&Reader> {
        self.reader.as_ref()
    }

    /// Raw field writer, when the field is reachable.
    pub fn writer(&self) -> Option<&Writer> {
        self.writer.as_ref()
    }
}

impl fmt::Debug for PropertyShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyShape")
            .field("name", &self.name)
            .field("declaring_class", &self.declaring_class)
            .field("visibility", &self.visibility)
            .field("doc_comment", &self.doc_comment)
            .field("readable", &self.reader.is_some())
            .field("writable", &self.writer.is_some())
            .finish()
    }
}

/// What an accessor method does.
#[derive(Clone)]
pub enum MethodKind {
    /// Takes no argument and returns a value.
    Getter(Reader),
    /// Takes a value and returns nothing.
    Setter(Writer),
}

/// An accessor method exposed by a class.
#[derive(Clone)]
pub struct MethodShape {
    name: String,
    visibility: Visibility,
    kind: MethodKind,
}

impl MethodShape {
    /// Method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Method visibility.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Getter callable, if this method is a getter.
    pub fn as_getter(&self) -> Option<&Reader> {
        match &self.kind {
            MethodKind::Getter(reader) => Some(reader),
            MethodKind::Setter(_) => None,
        }
    }

    /// Setter callable, if this method is a setter.
    pub fn as_setter(&self) -> Option<&Writer> {
        match &self.kind {
            MethodKind::Setter(writer) => Some(writer),
            MethodKind::Getter(_) => None,
        }
    }
}

impl fmt::Debug for MethodShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            MethodKind::Getter(_) => "getter",
            MethodKind::Setter(_) => "setter",
        };
        f.debug_struct("MethodShape")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("kind", &kind)
            .finish()
    }
}

/// The reflective shape of a class.
#[derive(Clone)]
pub struct ClassShape {
    name: String,
    parent: Option<String>,
    properties: Vec<PropertyShape>,
    methods: Vec<MethodShape>,
    constructor: Constructor,
}

impl ClassShape {
    /// Starts a shape for `T`.
    pub fn builder<T: Reflect>() -> ShapeBuilder<T> {
        ShapeBuilder {
            parent: None,
            properties: Vec::new(),
            methods: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Class identity.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent class identity.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// All properties, in declaration order.
    pub fn properties(&self) -> &[PropertyShape] {
        &self.properties
    }

    /// Looks up a property by name.
    pub fn property(&self, name: &str) -> Option<&PropertyShape> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// All accessor methods.
    pub fn methods(&self) -> &[MethodShape] {
        &self.methods
    }

    /// Looks up a method by name.
    pub fn method(&self, name: &str) -> Option<&MethodShape> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Returns true when the class exposes a method with this name.
    pub fn has_method(&self, name: &str) -> bool {
        self.method(name).is_some()
    }

    /// Creates a blank instance of the class.
    pub fn instantiate(&self) -> Box<dyn Entity> {
        (self.constructor)()
    }
}

impl fmt::Debug for ClassShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassShape")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("properties", &self.properties)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

/// Builds a [`ClassShape`] from typed closures.
pub struct ShapeBuilder<T: Reflect> {
    parent: Option<String>,
    properties: Vec<PropertyShape>,
    methods: Vec<MethodShape>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Reflect> ShapeBuilder<T> {
    /// Declares the parent class.
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Declares a property on `T` with raw field access.
    pub fn property<G, S>(self, name: &str, visibility: Visibility, get: G, set: S) -> Self
    where
        G: Fn(&T) -> Value + Send + Sync + 'static,
        S: Fn(&mut T, Value) -> Result<(), TransformError> + Send + Sync + 'static,
    {
        self.inherited_property(T::CLASS, name, visibility, get, set)
    }

    /// Declares a property that `T` inherits from `declaring_class`.
    pub fn inherited_property<G, S>(
        mut self,
        declaring_class: &str,
        name: &str,
        visibility: Visibility,
        get: G,
        set: S,
    ) -> Self
    where
        G: Fn(&T) -> Value + Send + Sync + 'static,
        S: Fn(&mut T, Value) -> Result<(), TransformError> + Send + Sync + 'static,
    {
        self.properties.push(PropertyShape {
            name: name.to_string(),
            declaring_class: declaring_class.to_string(),
            visibility,
            doc_comment: None,
            reader: Some(typed_reader::<T, _>(name, get)),
            writer: Some(typed_writer::<T, _>(name, set)),
        });
        self
    }

    /// Declares a property whose storage cannot be reached directly.
    pub fn opaque_property(mut self, name: &str, visibility: Visibility) -> Self {
        self.properties.push(PropertyShape {
            name: name.to_string(),
            declaring_class: T::CLASS.to_string(),
            visibility,
            doc_comment: None,
            reader: None,
            writer: None,
        });
        self
    }

    /// Attaches a documentation comment to the last declared property.
    pub fn doc(mut self, comment: &str) -> Self {
        if let Some(property) = self.properties.last_mut() {
            property.doc_comment = Some(comment.to_string());
        }
        self
    }

    /// Declares a getter method.
    pub fn getter<G>(mut self, name: &str, visibility: Visibility, get: G) -> Self
    where
        G: Fn(&T) -> Value + Send + Sync + 'static,
    {
        self.methods.push(MethodShape {
            name: name.to_string(),
            visibility,
            kind: MethodKind::Getter(typed_reader::<T, _>(name, get)),
        });
        self
    }

    /// Declares a setter method.
    pub fn setter<S>(mut self, name: &str, visibility: Visibility, set: S) -> Self
    where
        S: Fn(&mut T, Value) -> Result<(), TransformError> + Send + Sync + 'static,
    {
        self.methods.push(MethodShape {
            name: name.to_string(),
            visibility,
            kind: MethodKind::Setter(typed_writer::<T, _>(name, set)),
        });
        self
    }

    /// Finishes the shape.
    pub fn build(self) -> ClassShape {
        ClassShape {
            name: T::CLASS.to_string(),
            parent: self.parent,
            properties: self.properties,
            methods: self.methods,
            constructor: Arc::new(|| Box::new(T::default()) as Box<dyn Entity>),
        }
    }
}

fn wrong_instance(member: &str, actual: &str, expected: &str) -> PropertyError {
    PropertyError::Access {
        class: expected.to_string(),
        property: member.to_string(),
        message: format!("object of class {} is not an instance of {}", actual, expected),
    }
}

fn typed_reader<T, G>(member: &str, get: G) -> Reader
where
    T: Reflect,
    G: Fn(&T) -> Value + Send + Sync + 'static,
{
    let member = member.to_string();
    Arc::new(move |object: &dyn Entity| {
        let typed = object
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| wrong_instance(&member, object.class_name(), T::CLASS))?;
        Ok(get(typed))
    })
}

fn typed_writer<T, S>(member: &str, set: S) -> Writer
where
    T: Reflect,
    S: Fn(&mut T, Value) -> Result<(), TransformError> + Send + Sync + 'static,
{
    let member = member.to_string();
    Arc::new(move |object: &mut dyn Entity, value: Value| {
        let actual = object.class_name().to_string();
        let typed = object
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| wrong_instance(&member, &actual, T::CLASS))?;
        set(typed, value)?;
        Ok(())
    })
}

/// Class-name → shape table, filled once at start-up.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    shapes: HashMap<String, Arc<ClassShape>>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T`, replacing any earlier shape for the same class.
    pub fn register<T: Reflect>(&mut self) -> &mut Self {
        self.register_shape(T::shape())
    }

    /// Registers a prebuilt shape.
    pub fn register_shape(&mut self, shape: ClassShape) -> &mut Self {
        tracing::trace!("Registered class shape '{}'", shape.name());
        self.shapes.insert(shape.name().to_string(), Arc::new(shape));
        self
    }

    /// Builder-style [`TypeRegistry::register`].
    pub fn with<T: Reflect>(mut self) -> Self {
        self.register::<T>();
        self
    }

    /// Looks up a shape by class name.
    pub fn get(&self, class: &str) -> Option<Arc<ClassShape>> {
        self.shapes.get(class).cloned()
    }

    /// Returns true if the class is registered.
    pub fn contains(&self, class: &str) -> bool {
        self.shapes.contains_key(class)
    }

    /// Registered class names, in no particular order.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.shapes.keys().map(String::as_str)
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Registered class names of the hierarchy of `class`, root first.
    ///
    /// The walk stops at the first unregistered ancestor.
    pub fn hierarchy(&self, class: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = self.shapes.get(class);
        while let Some(shape) = current {
            if chain.iter().any(|c: &String| c == shape.name()) {
                break;
            }
            chain.push(shape.name().to_string());
            current = shape.parent().and_then(|p| self.shapes.get(p));
        }
        chain.reverse();
        chain
    }
}

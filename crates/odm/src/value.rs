//! Dynamic domain values.
//!
//! [`Value`] is what flows between property accessors and the navigator. The
//! typed `into_*` helpers turn a value back into a concrete field type inside
//! setter closures and fail with [`TransformError`] on a mismatch.

use chrono::{DateTime, Utc};

use crate::error::TransformError;
use crate::reflect::{Entity, Reflect};

/// A dynamically typed domain value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Text.
    String(String),
    /// Signed integer.
    Integer(i64),
    /// Boolean flag.
    Boolean(bool),
    /// Floating point number.
    Double(f64),
    /// Point in time.
    DateTime(DateTime<Utc>),
    /// Ordered list.
    Array(Vec<Value>),
    /// Ordered associative array.
    Map(Vec<(String, Value)>),
    /// Nested domain object.
    Object(Box<dyn Entity>),
}

impl Value {
    /// Wraps a domain object.
    pub fn object<T: Reflect>(object: T) -> Self {
        Value::Object(Box::new(object))
    }

    /// Wraps an optional domain object; `None` becomes [`Value::Null`].
    pub fn opt_object<T: Reflect>(object: Option<T>) -> Self {
        object.map(Value::object).unwrap_or(Value::Null)
    }

    /// Wraps a list of domain objects.
    pub fn objects<T: Reflect>(objects: Vec<T>) -> Self {
        Value::Array(objects.into_iter().map(Value::object).collect())
    }

    /// Wraps an already boxed domain object.
    pub fn from_entity(object: Box<dyn Entity>) -> Self {
        Value::Object(object)
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Boolean(_) => "boolean",
            Value::Double(_) => "double",
            Value::DateTime(_) => "datetime",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
        }
    }

    /// Borrows the string content, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrows the nested object, if any.
    pub fn as_entity(&self) -> Option<&dyn Entity> {
        match self {
            Value::Object(object) => Some(object.as_ref()),
            _ => None,
        }
    }

    /// Takes the string content.
    pub fn into_string(self) -> Result<String, TransformError> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }

    /// Takes the string content; null becomes `None`.
    pub fn into_opt_string(self) -> Result<Option<String>, TransformError> {
        match self {
            Value::Null => Ok(None),
            other => other.into_string().map(Some),
        }
    }

    /// Takes the integer content. Doubles are truncated.
    pub fn into_i64(self) -> Result<i64, TransformError> {
        match self {
            Value::Integer(i) => Ok(i),
            Value::Double(d) if d.is_finite() => Ok(d as i64),
            other => Err(mismatch("integer", &other)),
        }
    }

    /// Takes the integer content; null becomes `None`.
    pub fn into_opt_i64(self) -> Result<Option<i64>, TransformError> {
        match self {
            Value::Null => Ok(None),
            other => other.into_i64().map(Some),
        }
    }

    /// Takes the boolean content.
    pub fn into_bool(self) -> Result<bool, TransformError> {
        match self {
            Value::Boolean(b) => Ok(b),
            other => Err(mismatch("boolean", &other)),
        }
    }

    /// Takes the floating point content. Integers are widened.
    pub fn into_f64(self) -> Result<f64, TransformError> {
        match self {
            Value::Double(d) => Ok(d),
            Value::Integer(i) => Ok(i as f64),
            other => Err(mismatch("double", &other)),
        }
    }

    /// Takes the point in time.
    pub fn into_datetime(self) -> Result<DateTime<Utc>, TransformError> {
        match self {
            Value::DateTime(dt) => Ok(dt),
            other => Err(mismatch("datetime", &other)),
        }
    }

    /// Takes the point in time; null becomes `None`.
    pub fn into_opt_datetime(self) -> Result<Option<DateTime<Utc>>, TransformError> {
        match self {
            Value::Null => Ok(None),
            other => other.into_datetime().map(Some),
        }
    }

    /// Takes the nested object as a `T`.
    pub fn into_entity<T: Reflect>(self) -> Result<T, TransformError> {
        match self {
            Value::Object(object) => {
                let actual = object.class_name().to_string();
                object
                    .into_any()
                    .downcast::<T>()
                    .map(|boxed| *boxed)
                    .map_err(|_| {
                        TransformError::failed(format!(
                            "expected an object of class {}, got {}",
                            T::CLASS,
                            actual
                        ))
                    })
            }
            other => Err(mismatch(T::CLASS, &other)),
        }
    }

    /// Takes the nested object as a `T`; null becomes `None`.
    pub fn into_opt_entity<T: Reflect>(self) -> Result<Option<T>, TransformError> {
        match self {
            Value::Null => Ok(None),
            other => other.into_entity().map(Some),
        }
    }

    /// Takes a list of `T` objects. Null becomes an empty list.
    pub fn into_entity_vec<T: Reflect>(self) -> Result<Vec<T>, TransformError> {
        self.into_list()?
            .into_iter()
            .map(Value::into_entity)
            .collect()
    }

    /// Takes the elements of a list or the values of a map. Null becomes an
    /// empty list.
    pub fn into_list(self) -> Result<Vec<Value>, TransformError> {
        match self {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => Ok(items),
            Value::Map(entries) => Ok(entries.into_iter().map(|(_, v)| v).collect()),
            other => Err(mismatch("array", &other)),
        }
    }
}

fn mismatch(expected: &str, actual: &Value) -> TransformError {
    TransformError::failed(format!("expected {}, got {}", expected, actual.kind()))
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::ClassShape;
    use chrono::TimeZone;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Leaf {
        id: i64,
    }

    impl Reflect for Leaf {
        const CLASS: &'static str = "tree::Leaf";

        fn shape() -> ClassShape {
            ClassShape::builder::<Self>().build()
        }
    }

    #[test]
    fn test_primitive_conversions() {
        assert_eq!(Value::from("a").into_string().unwrap(), "a");
        assert_eq!(Value::from(7i32).into_i64().unwrap(), 7);
        assert_eq!(Value::from(2.9).into_i64().unwrap(), 2);
        assert_eq!(Value::from(3i64).into_f64().unwrap(), 3.0);
        assert!(Value::from(true).into_bool().unwrap());
        assert!(Value::from(None::<String>).is_null());
        assert_eq!(Value::Null.into_opt_string().unwrap(), None);
    }

    #[test]
    fn test_mismatch_is_transform_error() {
        let err = Value::from(1).into_string().unwrap_err();
        assert_eq!(
            err.to_string(),
            "transformation failed: expected string, got integer"
        );
    }

    #[test]
    fn test_datetime_conversion() {
        let dt = Utc.timestamp_opt(1_534_332_695, 0).unwrap();
        assert_eq!(Value::from(dt).into_datetime().unwrap(), dt);
        assert_eq!(Value::Null.into_opt_datetime().unwrap(), None);
    }

    #[test]
    fn test_entity_conversions() {
        let value = Value::object(Leaf { id: 4 });
        assert_eq!(value.as_entity().map(|e| e.class_name()), Some("tree::Leaf"));
        assert_eq!(value.into_entity::<Leaf>().unwrap(), Leaf { id: 4 });

        let list = Value::objects(vec![Leaf { id: 1 }, Leaf { id: 2 }]);
        let leaves: Vec<Leaf> = list.into_entity_vec().unwrap();
        assert_eq!(leaves.len(), 2);

        assert_eq!(Value::Null.into_opt_entity::<Leaf>().unwrap(), None);
        assert!(Value::Null.into_entity_vec::<Leaf>().unwrap().is_empty());
    }

    #[test]
    fn test_map_into_list_keeps_value_order() {
        let map = Value::Map(vec![
            ("b".to_string(), Value::from(2)),
            ("a".to_string(), Value::from(1)),
        ]);
        let items = map.into_list().unwrap();
        assert!(matches!(items[0], Value::Integer(2)));
        assert!(matches!(items[1], Value::Integer(1)));
    }
}

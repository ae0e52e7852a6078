//! Visitor seam of the navigator.
//!
//! A [`Visitor`] converts one representation into another, one typed value
//! at a time. The [`DataNavigator`](super::DataNavigator) decides which
//! `visit_*` method applies and hands the visitor a [`Navigation`] so nested
//! values (array elements, object properties) go back through the navigator.

use serde_json::Value as JsonValue;

use crate::error::OdmResult;
use crate::metadata::TypeTag;
use crate::transformer::config::TypeConfig;
use crate::transformer::datetime::is_time_format;
use crate::transformer::navigator::Navigation;
use crate::value::Value;

/// Input that the navigator can type when no config is given.
pub trait Navigable {
    /// Infers the most specific config for this value.
    fn suggested_config(&self) -> TypeConfig;
}

impl Navigable for Value {
    fn suggested_config(&self) -> TypeConfig {
        let tag = match self {
            Value::Null => TypeTag::Null,
            Value::DateTime(_) => TypeTag::DateTime,
            Value::String(s) if is_time_format(s) => TypeTag::Time,
            Value::String(_) => TypeTag::String,
            Value::Integer(_) => TypeTag::Integer,
            Value::Boolean(_) => TypeTag::Boolean,
            Value::Double(_) => TypeTag::Double,
            Value::Array(_) | Value::Map(_) => TypeTag::Array,
            Value::Object(object) => return TypeConfig::object(object.class_name()),
        };
        TypeConfig::new(tag)
    }
}

impl Navigable for JsonValue {
    fn suggested_config(&self) -> TypeConfig {
        let tag = match self {
            JsonValue::Null => TypeTag::Null,
            JsonValue::String(s) if is_time_format(s) => TypeTag::Time,
            JsonValue::String(_) => TypeTag::String,
            JsonValue::Bool(_) => TypeTag::Boolean,
            JsonValue::Number(n) if n.is_i64() || n.is_u64() => TypeTag::Integer,
            JsonValue::Number(_) => TypeTag::Double,
            JsonValue::Array(_) | JsonValue::Object(_) => TypeTag::Array,
        };
        TypeConfig::new(tag)
    }
}

/// Converts values of one representation into another.
pub trait Visitor: Sized {
    /// Representation being read.
    type Input: Navigable;
    /// Representation being produced.
    type Output;

    /// Visits a null value.
    fn visit_null(
        &self,
        data: Self::Input,
        config: TypeConfig,
        nav: &mut Navigation<'_>,
    ) -> OdmResult<Self::Output>;

    /// Visits a string.
    fn visit_string(
        &self,
        data: Self::Input,
        config: TypeConfig,
        nav: &mut Navigation<'_>,
    ) -> OdmResult<Self::Output>;

    /// Visits an integer.
    fn visit_integer(
        &self,
        data: Self::Input,
        config: TypeConfig,
        nav: &mut Navigation<'_>,
    ) -> OdmResult<Self::Output>;

    /// Visits a boolean.
    fn visit_boolean(
        &self,
        data: Self::Input,
        config: TypeConfig,
        nav: &mut Navigation<'_>,
    ) -> OdmResult<Self::Output>;

    /// Visits a floating point number.
    fn visit_double(
        &self,
        data: Self::Input,
        config: TypeConfig,
        nav: &mut Navigation<'_>,
    ) -> OdmResult<Self::Output>;

    /// Visits a calendar date.
    fn visit_date(
        &self,
        data: Self::Input,
        config: TypeConfig,
        nav: &mut Navigation<'_>,
    ) -> OdmResult<Self::Output>;

    /// Visits a point in time.
    fn visit_date_time(
        &self,
        data: Self::Input,
        config: TypeConfig,
        nav: &mut Navigation<'_>,
    ) -> OdmResult<Self::Output> {
        self.visit_date(data, config, nav)
    }

    /// Visits a time of day.
    fn visit_time(
        &self,
        data: Self::Input,
        config: TypeConfig,
        nav: &mut Navigation<'_>,
    ) -> OdmResult<Self::Output>;

    /// Visits a list or associative array.
    fn visit_array(
        &self,
        data: Self::Input,
        config: TypeConfig,
        nav: &mut Navigation<'_>,
    ) -> OdmResult<Self::Output>;

    /// Visits a nested object.
    fn visit_object(
        &self,
        data: Self::Input,
        config: TypeConfig,
        nav: &mut Navigation<'_>,
    ) -> OdmResult<Self::Output>;
}

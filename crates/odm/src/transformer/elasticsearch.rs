//! The Elasticsearch visitor pair.
//!
//! [`ElasticsearchVisitor`] turns domain values into document JSON;
//! [`ReverseElasticsearchVisitor`] turns document JSON back into domain
//! values. Dates travel as epoch milliseconds and times of day as seconds
//! since midnight. Scalar casts are lenient: numeric prefixes of strings are
//! honoured, and booleans cast to `0`/`1`.

use chrono::{DateTime, Timelike};
use serde_json::{Map, Number, Value as JsonValue};

use crate::error::{OdmResult, TransformError};
use crate::transformer::config::TypeConfig;
use crate::transformer::datetime::{format_time, is_time_format, parse_datetime, seconds_since_midnight};
use crate::transformer::navigator::Navigation;
use crate::transformer::visitor::Visitor;
use crate::value::Value;

/// Domain value → document JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElasticsearchVisitor;

impl Visitor for ElasticsearchVisitor {
    type Input = Value;
    type Output = JsonValue;

    fn visit_null(&self, _data: Value, _config: TypeConfig, _nav: &mut Navigation<'_>) -> OdmResult<JsonValue> {
        Ok(JsonValue::Null)
    }

    fn visit_string(&self, data: Value, _config: TypeConfig, _nav: &mut Navigation<'_>) -> OdmResult<JsonValue> {
        let text = match data {
            Value::Null => String::new(),
            Value::String(s) => s,
            Value::Integer(i) => i.to_string(),
            Value::Boolean(b) => if b { "1".to_string() } else { String::new() },
            Value::Double(d) => format_double(d),
            Value::DateTime(dt) => dt.to_rfc3339(),
            other => return Err(cast_error("string", other.kind()).into()),
        };
        Ok(JsonValue::String(text))
    }

    fn visit_integer(&self, data: Value, _config: TypeConfig, _nav: &mut Navigation<'_>) -> OdmResult<JsonValue> {
        let number = match data {
            Value::Null => 0,
            Value::Integer(i) => i,
            Value::Boolean(b) => i64::from(b),
            Value::Double(d) => double_to_int(d),
            Value::String(s) => leading_int(&s),
            other => return Err(cast_error("integer", other.kind()).into()),
        };
        Ok(JsonValue::from(number))
    }

    fn visit_boolean(&self, data: Value, _config: TypeConfig, _nav: &mut Navigation<'_>) -> OdmResult<JsonValue> {
        let flag = match data {
            Value::Null => false,
            Value::Boolean(b) => b,
            Value::Integer(i) => i != 0,
            Value::Double(d) => d != 0.0,
            Value::String(s) => !(s.is_empty() || s == "0"),
            Value::Array(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
            Value::DateTime(_) | Value::Object(_) => true,
        };
        Ok(JsonValue::Bool(flag))
    }

    fn visit_double(&self, data: Value, _config: TypeConfig, _nav: &mut Navigation<'_>) -> OdmResult<JsonValue> {
        let number = match data {
            Value::Null => 0.0,
            Value::Double(d) => d,
            Value::Integer(i) => i as f64,
            Value::Boolean(b) => f64::from(u8::from(b)),
            Value::String(s) => leading_float(&s),
            other => return Err(cast_error("double", other.kind()).into()),
        };
        Ok(double_json(number))
    }

    fn visit_date(&self, data: Value, _config: TypeConfig, _nav: &mut Navigation<'_>) -> OdmResult<JsonValue> {
        match data {
            Value::Null => Ok(JsonValue::Null),
            Value::DateTime(dt) => Ok(JsonValue::from(dt.timestamp_millis())),
            Value::Integer(millis) => Ok(JsonValue::from(millis)),
            Value::String(s) => {
                let dt = parse_datetime(&s).ok_or_else(|| {
                    TransformError::failed(format!("date \"{}\" could not be parsed", s))
                })?;
                Ok(JsonValue::from(dt.timestamp() * 1000))
            }
            other => Err(cast_error("date", other.kind()).into()),
        }
    }

    fn visit_time(&self, data: Value, _config: TypeConfig, _nav: &mut Navigation<'_>) -> OdmResult<JsonValue> {
        let seconds = match data {
            Value::Null => 0,
            Value::String(s) => seconds_since_midnight(&s)?,
            Value::Integer(i) => i,
            Value::DateTime(dt) => i64::from(dt.num_seconds_from_midnight()),
            other => return Err(cast_error("time", other.kind()).into()),
        };
        Ok(JsonValue::from(seconds))
    }

    fn visit_array(&self, data: Value, config: TypeConfig, nav: &mut Navigation<'_>) -> OdmResult<JsonValue> {
        let element_config = || config.class.clone().map(TypeConfig::object);

        match data {
            Value::Null => Ok(JsonValue::Array(Vec::new())),
            Value::Array(items) => {
                let mut visited = Vec::with_capacity(items.len());
                for item in items {
                    visited.push(nav.navigate(item, self, element_config())?);
                }
                Ok(JsonValue::Array(visited))
            }
            Value::Map(entries) => {
                let mut visited = Map::new();
                for (key, item) in entries {
                    let value = nav.navigate(item, self, element_config())?;
                    visited.insert(key, value);
                }
                Ok(JsonValue::Object(visited))
            }
            scalar => Ok(JsonValue::Array(vec![nav.navigate(scalar, self, element_config())?])),
        }
    }

    fn visit_object(&self, data: Value, _config: TypeConfig, nav: &mut Navigation<'_>) -> OdmResult<JsonValue> {
        match data {
            Value::Null => Ok(JsonValue::Null),
            Value::Object(object) => {
                let fields = nav.navigate_object(object.as_ref(), self)?;
                Ok(JsonValue::Object(fields.into_iter().collect()))
            }
            other => Err(cast_error("object", other.kind()).into()),
        }
    }
}

/// Document JSON → domain value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReverseElasticsearchVisitor;

impl Visitor for ReverseElasticsearchVisitor {
    type Input = JsonValue;
    type Output = Value;

    fn visit_null(&self, _data: JsonValue, _config: TypeConfig, _nav: &mut Navigation<'_>) -> OdmResult<Value> {
        Ok(Value::Null)
    }

    fn visit_string(&self, data: JsonValue, _config: TypeConfig, _nav: &mut Navigation<'_>) -> OdmResult<Value> {
        let text = match data {
            JsonValue::Null => String::new(),
            JsonValue::String(s) => s,
            JsonValue::Bool(b) => if b { "1".to_string() } else { String::new() },
            JsonValue::Number(n) => match n.as_f64() {
                Some(d) if !n.is_i64() && !n.is_u64() => format_double(d),
                _ => n.to_string(),
            },
            other => return Err(cast_error("string", json_kind(&other)).into()),
        };
        Ok(Value::String(text))
    }

    fn visit_integer(&self, data: JsonValue, _config: TypeConfig, _nav: &mut Navigation<'_>) -> OdmResult<Value> {
        let number = match data {
            JsonValue::Null => 0,
            JsonValue::Bool(b) => i64::from(b),
            JsonValue::Number(n) => json_to_int(&n),
            JsonValue::String(s) => leading_int(&s),
            other => return Err(cast_error("integer", json_kind(&other)).into()),
        };
        Ok(Value::Integer(number))
    }

    fn visit_boolean(&self, data: JsonValue, _config: TypeConfig, _nav: &mut Navigation<'_>) -> OdmResult<Value> {
        let flag = match data {
            JsonValue::Null => false,
            JsonValue::Bool(b) => b,
            JsonValue::Number(n) => n.as_f64().is_some_and(|d| d != 0.0),
            JsonValue::String(s) => !(s.is_empty() || s == "0"),
            JsonValue::Array(items) => !items.is_empty(),
            JsonValue::Object(entries) => !entries.is_empty(),
        };
        Ok(Value::Boolean(flag))
    }

    fn visit_double(&self, data: JsonValue, _config: TypeConfig, _nav: &mut Navigation<'_>) -> OdmResult<Value> {
        let number = match data {
            JsonValue::Null => 0.0,
            JsonValue::Bool(b) => f64::from(u8::from(b)),
            JsonValue::Number(n) => n.as_f64().unwrap_or(0.0),
            JsonValue::String(s) => leading_float(&s),
            other => return Err(cast_error("double", json_kind(&other)).into()),
        };
        Ok(Value::Double(number))
    }

    fn visit_date(&self, data: JsonValue, _config: TypeConfig, _nav: &mut Navigation<'_>) -> OdmResult<Value> {
        match data {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Number(n) => DateTime::from_timestamp_millis(json_to_int(&n))
                .map(Value::DateTime)
                .ok_or_else(|| unconvertible_date(&n).into()),
            JsonValue::String(s) => parse_datetime(&s)
                .map(Value::DateTime)
                .ok_or_else(|| unconvertible_date(&s).into()),
            other => Err(unconvertible_date(&other).into()),
        }
    }

    fn visit_time(&self, data: JsonValue, _config: TypeConfig, _nav: &mut Navigation<'_>) -> OdmResult<Value> {
        let seconds = match data {
            JsonValue::String(s) if is_time_format(&s) => return Ok(Value::String(s)),
            JsonValue::String(s) => leading_int(&s),
            JsonValue::Number(n) => json_to_int(&n),
            JsonValue::Bool(b) => i64::from(b),
            JsonValue::Null => 0,
            other => return Err(cast_error("time", json_kind(&other)).into()),
        };
        Ok(Value::String(format_time(seconds)))
    }

    fn visit_array(&self, data: JsonValue, config: TypeConfig, nav: &mut Navigation<'_>) -> OdmResult<Value> {
        let element_config = || config.class.clone().map(TypeConfig::object);

        match data {
            JsonValue::Null => Ok(Value::Array(Vec::new())),
            JsonValue::Array(items) => {
                let mut visited = Vec::with_capacity(items.len());
                for item in items {
                    visited.push(nav.navigate(item, self, element_config())?);
                }
                Ok(Value::Array(visited))
            }
            JsonValue::Object(entries) => {
                let mut visited = Vec::with_capacity(entries.len());
                for (key, item) in entries {
                    let value = nav.navigate(item, self, element_config())?;
                    visited.push((key, value));
                }
                Ok(Value::Map(visited))
            }
            scalar => Ok(Value::Array(vec![nav.navigate(scalar, self, element_config())?])),
        }
    }

    fn visit_object(&self, data: JsonValue, config: TypeConfig, nav: &mut Navigation<'_>) -> OdmResult<Value> {
        match data {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Object(fields) => {
                let object = nav.hydrate_object(fields, config, self)?;
                Ok(Value::Object(object))
            }
            other => Err(cast_error("object", json_kind(&other)).into()),
        }
    }
}

fn cast_error(target: &str, actual: &str) -> TransformError {
    TransformError::failed(format!("cannot cast {} to {}", actual, target))
}

fn unconvertible_date(raw: &dyn std::fmt::Display) -> TransformError {
    TransformError::failed(format!(
        "date \"{}\" could not be converted to a date time",
        raw
    ))
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Formats a double the short way: `1.0` becomes `"1"`.
fn format_double(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn double_to_int(value: f64) -> i64 {
    if value.is_finite() { value as i64 } else { 0 }
}

fn double_json(value: f64) -> JsonValue {
    Number::from_f64(value).map_or(JsonValue::Null, JsonValue::Number)
}

fn json_to_int(number: &Number) -> i64 {
    number
        .as_i64()
        .or_else(|| number.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
        .or_else(|| number.as_f64().map(double_to_int))
        .unwrap_or(0)
}

/// Integer value of the leading numeric part of a string, 0 when none.
fn leading_int(text: &str) -> i64 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let prefix = &text[..end];
    match prefix.parse::<i64>() {
        Ok(n) => n,
        Err(_) if prefix.len() > 1 => {
            if prefix.starts_with('-') { i64::MIN } else { i64::MAX }
        }
        Err(_) => 0,
    }
}

/// Float value of the leading numeric part of a string, 0 when none.
fn leading_float(text: &str) -> f64 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == digits_start || &text[digits_start..end] == "." {
        return 0.0;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    text[..end].parse::<f64>().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int("42"), 42);
        assert_eq!(leading_int("  -7 apples"), -7);
        assert_eq!(leading_int("12abc"), 12);
        assert_eq!(leading_int("abc"), 0);
        assert_eq!(leading_int("-"), 0);
        assert_eq!(leading_int(""), 0);
    }

    #[test]
    fn test_leading_float() {
        assert_eq!(leading_float("45.657"), 45.657);
        assert_eq!(leading_float("1e3x"), 1000.0);
        assert_eq!(leading_float("3."), 3.0);
        assert_eq!(leading_float(".5"), 0.5);
        assert_eq!(leading_float("."), 0.0);
        assert_eq!(leading_float("2e"), 2.0);
        assert_eq!(leading_float("none"), 0.0);
    }

    #[test]
    fn test_format_double() {
        assert_eq!(format_double(1.0), "1");
        assert_eq!(format_double(0.5), "0.5");
        assert_eq!(format_double(-3.25), "-3.25");
    }
}

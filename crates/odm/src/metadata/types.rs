use std::fmt;

/// Semantic type of a mapped property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// No value.
    Null,
    /// Text.
    String,
    /// Signed integer.
    Integer,
    /// Boolean flag.
    Boolean,
    /// Floating point number.
    Double,
    /// Calendar date, stored as epoch milliseconds.
    Date,
    /// Point in time, stored as epoch milliseconds.
    DateTime,
    /// Time of day, stored as seconds since midnight.
    Time,
    /// List or associative array.
    Array,
    /// Nested mapped object.
    Object,
}

impl TypeTag {
    /// Parses a tag as written in configuration, aliases included.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "NULL" | "null" => Some(TypeTag::Null),
            "string" => Some(TypeTag::String),
            "int" | "integer" => Some(TypeTag::Integer),
            "bool" | "boolean" => Some(TypeTag::Boolean),
            "double" | "float" => Some(TypeTag::Double),
            "date" => Some(TypeTag::Date),
            "dateTime" | "datetime" => Some(TypeTag::DateTime),
            "time" => Some(TypeTag::Time),
            "array" => Some(TypeTag::Array),
            "object" => Some(TypeTag::Object),
            _ => None,
        }
    }

    /// Canonical tag name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::String => "string",
            TypeTag::Integer => "integer",
            TypeTag::Boolean => "boolean",
            TypeTag::Double => "double",
            TypeTag::Date => "date",
            TypeTag::DateTime => "datetime",
            TypeTag::Time => "time",
            TypeTag::Array => "array",
            TypeTag::Object => "object",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Field declarations and value validators.

use entgraph_common::types::Value;
use std::fmt;

/// Validator for a field's values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Any value.
    Any,
    /// Boolean.
    Bool,
    /// 64-bit integer.
    Int64,
    /// 64-bit float (integers are not coerced).
    Float64,
    /// String.
    String,
    /// Reference to a document of the named table.
    Id(String),
    /// Array whose elements match the inner validator.
    Array(Box<FieldType>),
    /// The inner validator, or absent.
    Optional(Box<FieldType>),
}

impl FieldType {
    /// Wraps a validator in [`FieldType::Optional`].
    #[must_use]
    pub fn optional(inner: FieldType) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// Returns true if the field may be absent.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_) | Self::Any)
    }

    /// Checks a present value. ID targets are checked by the writer, which
    /// can consult the store; here only the kind is checked.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any, _) => true,
            (Self::Optional(inner), v) => inner.accepts(v),
            (Self::Bool, Value::Bool(_))
            | (Self::Int64, Value::Int64(_))
            | (Self::Float64, Value::Float64(_))
            | (Self::String, Value::String(_))
            | (Self::Id(_), Value::Id(_)) => true,
            (Self::Array(inner), Value::Array(items)) => items.iter().all(|v| inner.accepts(v)),
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Bool => write!(f, "bool"),
            Self::Int64 => write!(f, "int64"),
            Self::Float64 => write!(f, "float64"),
            Self::String => write!(f, "string"),
            Self::Id(table) => write!(f, "id<{table}>"),
            Self::Array(inner) => write!(f, "array<{inner}>"),
            Self::Optional(inner) => write!(f, "optional<{inner}>"),
        }
    }
}

/// A declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Validator.
    pub ty: FieldType,
    /// Value written when an insert omits the field.
    pub default: Option<Value>,
    /// Whether values must be unique within the table.
    pub unique: bool,
}

impl FieldDef {
    /// Creates a plain field.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            unique: false,
        }
    }

    /// Returns true if an insert may omit the field.
    #[must_use]
    pub fn may_be_absent(&self) -> bool {
        self.ty.is_optional() || self.default.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts() {
        assert!(FieldType::String.accepts(&Value::from("a")));
        assert!(!FieldType::String.accepts(&Value::Int64(1)));
        assert!(!FieldType::Float64.accepts(&Value::Int64(1)));
        assert!(FieldType::optional(FieldType::Int64).accepts(&Value::Int64(1)));
        assert!(
            FieldType::Array(Box::new(FieldType::Int64))
                .accepts(&Value::from(vec![1i64, 2, 3]))
        );
        assert!(
            !FieldType::Array(Box::new(FieldType::Int64))
                .accepts(&Value::Array(vec![Value::from("x")]))
        );
    }

    #[test]
    fn test_display() {
        let ty = FieldType::optional(FieldType::Array(Box::new(FieldType::Id("users".into()))));
        assert_eq!(ty.to_string(), "optional<array<id<users>>>");
    }

    #[test]
    fn test_may_be_absent() {
        let mut def = FieldDef::new("role", FieldType::String);
        assert!(!def.may_be_absent());
        def.default = Some(Value::from("member"));
        assert!(def.may_be_absent());
    }
}

//! Row predicates.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use entgraph_common::types::{Document, Value};

type Predicate = Arc<dyn Fn(&Document) -> bool + Send + Sync>;

/// A predicate over documents, evaluated after the index scan.
///
/// Absent fields compare as [`Value::Null`], which sorts before every
/// other value.
#[derive(Clone)]
pub enum Filter {
    /// `field == value`
    Eq(String, Value),
    /// `field != value`
    Ne(String, Value),
    /// `field < value`
    Lt(String, Value),
    /// `field <= value`
    Lte(String, Value),
    /// `field > value`
    Gt(String, Value),
    /// `field >= value`
    Gte(String, Value),
    /// All must hold.
    And(Vec<Filter>),
    /// Any must hold.
    Or(Vec<Filter>),
    /// Negation.
    Not(Box<Filter>),
    /// Arbitrary predicate.
    Custom(Predicate),
}

impl Filter {
    /// `field == value`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    /// `field != value`
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Ne(field.into(), value.into())
    }

    /// `field < value`
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lt(field.into(), value.into())
    }

    /// `field <= value`
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lte(field.into(), value.into())
    }

    /// `field > value`
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gt(field.into(), value.into())
    }

    /// `field >= value`
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gte(field.into(), value.into())
    }

    /// Wraps a closure.
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&Document) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(predicate))
    }

    /// Conjunction with `other`.
    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        match self {
            Self::And(mut all) => {
                all.push(other);
                Self::And(all)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Disjunction with `other`.
    #[must_use]
    pub fn or(self, other: Filter) -> Self {
        match self {
            Self::Or(mut any) => {
                any.push(other);
                Self::Or(any)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    /// Evaluates the predicate.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        let cmp = |field: &str, value: &Value| doc.get(field).unwrap_or(Value::Null).cmp(value);
        match self {
            Self::Eq(f, v) => cmp(f, v) == Ordering::Equal,
            Self::Ne(f, v) => cmp(f, v) != Ordering::Equal,
            Self::Lt(f, v) => cmp(f, v) == Ordering::Less,
            Self::Lte(f, v) => cmp(f, v) != Ordering::Greater,
            Self::Gt(f, v) => cmp(f, v) == Ordering::Greater,
            Self::Gte(f, v) => cmp(f, v) != Ordering::Less,
            Self::And(all) => all.iter().all(|f| f.matches(doc)),
            Self::Or(any) => any.iter().any(|f| f.matches(doc)),
            Self::Not(inner) => !inner.matches(doc),
            Self::Custom(predicate) => predicate(doc),
        }
    }
}

impl std::ops::Not for Filter {
    type Output = Filter;

    fn not(self) -> Self::Output {
        match self {
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq(field, v) => write!(f, "{field} == {v}"),
            Self::Ne(field, v) => write!(f, "{field} != {v}"),
            Self::Lt(field, v) => write!(f, "{field} < {v}"),
            Self::Lte(field, v) => write!(f, "{field} <= {v}"),
            Self::Gt(field, v) => write!(f, "{field} > {v}"),
            Self::Gte(field, v) => write!(f, "{field} >= {v}"),
            Self::And(all) => f.debug_tuple("And").field(all).finish(),
            Self::Or(any) => f.debug_tuple("Or").field(any).finish(),
            Self::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entgraph_common::fields;
    use entgraph_common::types::{DocId, Timestamp};

    fn doc() -> Document {
        Document::new(
            DocId::new(5),
            Timestamp::from_micros(10),
            fields! { "name" => "Ada", "age" => 36 },
        )
    }

    #[test]
    fn test_comparisons() {
        let doc = doc();
        assert!(Filter::eq("name", "Ada").matches(&doc));
        assert!(Filter::ne("name", "Bob").matches(&doc));
        assert!(Filter::gt("age", 30).matches(&doc));
        assert!(Filter::lte("age", 36).matches(&doc));
        assert!(!Filter::lt("age", 36).matches(&doc));
        assert!(Filter::eq("_id", DocId::new(5)).matches(&doc));
    }

    #[test]
    fn test_absent_field_is_null() {
        let doc = doc();
        assert!(Filter::eq("nickname", Value::Null).matches(&doc));
        assert!(Filter::lt("nickname", "a").matches(&doc));
    }

    #[test]
    fn test_combinators() {
        let doc = doc();
        let f = Filter::eq("name", "Ada").and(Filter::gte("age", 40));
        assert!(!f.matches(&doc));
        assert!((!f.clone()).matches(&doc));
        assert!(f.or(Filter::custom(|d| d.id == DocId::new(5))).matches(&doc));
    }
}

//! Query results.

use crate::atoms::AtomTuple;
use crate::collections::SemanticSet;
use crate::error::{ModelError, Result};

/// The value of an evaluated [`QueryExpr`](super::QueryExpr).
#[derive(Debug, Clone)]
pub enum QueryValue {
    Bool(bool),
    Set(SemanticSet<AtomTuple>),
    Tuple(AtomTuple),
    /// No value: `firstWhich` over nothing, or `parent` of a root model.
    Null,
}

impl QueryValue {
    /// Structural equality; sets compare with [`SemanticSet::identical`].
    pub fn identical(&self, other: &QueryValue) -> bool {
        match (self, other) {
            (QueryValue::Bool(a), QueryValue::Bool(b)) => a == b,
            (QueryValue::Set(a), QueryValue::Set(b)) => a.identical(b),
            (QueryValue::Tuple(a), QueryValue::Tuple(b)) => a == b,
            (QueryValue::Null, QueryValue::Null) => true,
            _ => false,
        }
    }

    /// Presence of any result. The complement of a finite set is never empty.
    pub fn truthy(&self) -> bool {
        match self {
            QueryValue::Bool(value) => *value,
            QueryValue::Set(set) => set.is_empty().map_or(true, |empty| !empty),
            QueryValue::Tuple(tuple) => !tuple.is_empty(),
            QueryValue::Null => false,
        }
    }

    /// The boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            QueryValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// The set, if this is one.
    pub fn as_set(&self) -> Option<&SemanticSet<AtomTuple>> {
        match self {
            QueryValue::Set(set) => Some(set),
            _ => None,
        }
    }

    /// The tuple, if this is one.
    pub fn as_tuple(&self) -> Option<&AtomTuple> {
        match self {
            QueryValue::Tuple(tuple) => Some(tuple),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, QueryValue::Null)
    }

    /// View the value as a set: a tuple is a singleton, null is empty.
    pub fn into_set(self, clause: &'static str) -> Result<SemanticSet<AtomTuple>> {
        match self {
            QueryValue::Set(set) => Ok(set),
            QueryValue::Tuple(tuple) => Ok(std::iter::once(tuple).collect()),
            QueryValue::Null => Ok(SemanticSet::new()),
            QueryValue::Bool(_) => Err(ModelError::QueryTypeMismatch {
                clause,
                reason: "expected a set, got a boolean".to_string(),
            }),
        }
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<SemanticSet<AtomTuple>> for QueryValue {
    fn from(set: SemanticSet<AtomTuple>) -> Self {
        QueryValue::Set(set)
    }
}

impl From<Option<AtomTuple>> for QueryValue {
    fn from(tuple: Option<AtomTuple>) -> Self {
        tuple.map_or(QueryValue::Null, QueryValue::Tuple)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical() {
        let a: SemanticSet<AtomTuple> = [AtomTuple::from("x")].into_iter().collect();
        let b: SemanticSet<AtomTuple> = [AtomTuple::from("x")].into_iter().collect();
        assert!(QueryValue::Set(a.clone()).identical(&QueryValue::Set(b)));
        assert!(!QueryValue::Set(a.clone()).identical(&QueryValue::Set(a.invert())));
        assert!(!QueryValue::Bool(true).identical(&QueryValue::Set(a)));
        assert!(QueryValue::Null.identical(&QueryValue::Null));
    }

    #[test]
    fn test_truthy() {
        assert!(!QueryValue::Set(SemanticSet::new()).truthy());
        assert!(QueryValue::Set(SemanticSet::universe()).truthy());
        assert!(QueryValue::Tuple(AtomTuple::from("x")).truthy());
        assert!(!QueryValue::Null.truthy());
    }

    #[test]
    fn test_into_set() {
        let set = QueryValue::Tuple(AtomTuple::from("x")).into_set("which").unwrap();
        assert!(set.contains(&AtomTuple::from("x")));
        assert!(QueryValue::Null.into_set("which").unwrap().is_empty().unwrap());
        assert!(matches!(
            QueryValue::Bool(true).into_set("which"),
            Err(ModelError::QueryTypeMismatch { clause: "which", .. })
        ));
    }
}

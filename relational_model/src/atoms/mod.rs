//! Atom definitions - the opaque entities every relation ranges over.

mod tuple;

pub use tuple::*;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// Opaque, comparable identifier for an entity in a model's universe.
///
/// Atoms are interned strings: cloning is a reference-count bump and
/// equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(Arc<str>);

impl Atom {
    /// Create an atom from its name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The atom's name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Atom {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Atom {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&Atom> for Atom {
    fn from(atom: &Atom) -> Self {
        atom.clone()
    }
}

impl std::fmt::Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Atom {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Atom {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(Atom::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_equality_is_structural() {
        let a = Atom::new("roomA");
        let b = Atom::from(String::from("roomA"));
        assert_eq!(a, b);
        assert_ne!(a, Atom::new("roomB"));
    }

    #[test]
    fn test_atom_serde() {
        let atom = Atom::new("person:player");
        let json = serde_json::to_string(&atom).unwrap();
        assert_eq!(json, "\"person:player\"");
        let back: Atom = serde_json::from_str(&json).unwrap();
        assert_eq!(back, atom);
    }
}

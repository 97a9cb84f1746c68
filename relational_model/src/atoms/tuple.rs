//! Atom tuples - the unit of relation membership.

use serde::{Deserialize, Serialize};

use super::Atom;

/// An immutable, flat, ordered sequence of atoms.
///
/// Building a tuple out of other tuples always yields one flat tuple, so
/// `(a, (b, c))` and `(a, b, c)` are the same value. Empty and single-atom
/// tuples are valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AtomTuple(Vec<Atom>);

impl AtomTuple {
    /// The empty tuple.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a tuple from atoms.
    pub fn new(atoms: impl IntoIterator<Item = impl Into<Atom>>) -> Self {
        Self(atoms.into_iter().map(Into::into).collect())
    }

    /// Concatenate tuples (or anything convertible to one) into a single flat tuple.
    pub fn flatten(parts: impl IntoIterator<Item = impl Into<AtomTuple>>) -> Self {
        Self(parts.into_iter().flat_map(|part| part.into().0).collect())
    }

    /// Number of atoms.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the tuple has no atoms.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first atom, which is the subject when the tuple is a fact.
    pub fn subject(&self) -> Option<&Atom> {
        self.0.first()
    }

    /// A one-atom tuple holding the first atom, or the empty tuple.
    pub fn first(&self) -> AtomTuple {
        Self(self.0.iter().take(1).cloned().collect())
    }

    /// Everything after the first atom.
    pub fn rest(&self) -> AtomTuple {
        Self(self.0.iter().skip(1).cloned().collect())
    }

    /// The tuple in reverse order.
    pub fn reversed(&self) -> AtomTuple {
        Self(self.0.iter().rev().cloned().collect())
    }

    /// Atom at `index`.
    pub fn get(&self, index: usize) -> Option<&Atom> {
        self.0.get(index)
    }

    /// Iterate over the atoms.
    pub fn iter(&self) -> impl Iterator<Item = &Atom> {
        self.0.iter()
    }

    /// Borrow the atoms as a slice.
    pub fn as_slice(&self) -> &[Atom] {
        &self.0
    }

    /// Prepend `head` to this tuple.
    pub fn prepend(&self, head: impl Into<AtomTuple>) -> AtomTuple {
        Self::flatten([head.into(), self.clone()])
    }
}

impl From<Atom> for AtomTuple {
    fn from(atom: Atom) -> Self {
        Self(vec![atom])
    }
}

impl From<&Atom> for AtomTuple {
    fn from(atom: &Atom) -> Self {
        Self(vec![atom.clone()])
    }
}

impl From<&str> for AtomTuple {
    fn from(name: &str) -> Self {
        Self(vec![Atom::new(name)])
    }
}

impl From<Vec<Atom>> for AtomTuple {
    fn from(atoms: Vec<Atom>) -> Self {
        Self(atoms)
    }
}

impl From<&AtomTuple> for AtomTuple {
    fn from(tuple: &AtomTuple) -> Self {
        tuple.clone()
    }
}

impl<const N: usize> From<[&str; N]> for AtomTuple {
    fn from(names: [&str; N]) -> Self {
        Self::new(names)
    }
}

impl FromIterator<Atom> for AtomTuple {
    fn from_iter<I: IntoIterator<Item = Atom>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a AtomTuple {
    type Item = &'a Atom;
    type IntoIter = std::slice::Iter<'a, Atom>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::fmt::Display for AtomTuple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, atom) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{atom}")?;
        }
        write!(f, ")")
    }
}

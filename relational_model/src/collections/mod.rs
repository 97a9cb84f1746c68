//! Collections keyed by canonical structural encoding.
//!
//! Relation members are composite tuples, so sets and maps here are keyed by
//! a canonical string encoding ([`SemanticKey`]) rather than by identity.
//! Two separately built but structurally equal values always share a key.

mod semantic_map;
mod semantic_set;

pub use semantic_map::*;
pub use semantic_set::*;

use crate::atoms::{Atom, AtomTuple};

/// Values with a total, deterministic canonical encoding.
///
/// Encodings are injective: reserved characters inside names are escaped, so
/// an atom named `a,b` never collides with the tuple `(a, b)`.
pub trait SemanticKey {
    /// Append this value's canonical encoding to `out`.
    fn write_key(&self, out: &mut String);

    /// The canonical encoding as an owned string.
    fn semantic_key(&self) -> String {
        let mut out = String::new();
        self.write_key(&mut out);
        out
    }
}

const RESERVED: &[char] = &['\\', '<', '>', ',', '{', '}', '(', ')', '|', '!'];

fn write_escaped(name: &str, out: &mut String) {
    for c in name.chars() {
        if RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}

impl SemanticKey for Atom {
    fn write_key(&self, out: &mut String) {
        write_escaped(self.name(), out);
    }
}

impl SemanticKey for str {
    fn write_key(&self, out: &mut String) {
        write_escaped(self, out);
    }
}

impl SemanticKey for String {
    fn write_key(&self, out: &mut String) {
        write_escaped(self, out);
    }
}

impl SemanticKey for AtomTuple {
    fn write_key(&self, out: &mut String) {
        out.push('<');
        for (i, atom) in self.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            atom.write_key(out);
        }
        out.push('>');
    }
}

impl<A: SemanticKey, B: SemanticKey> SemanticKey for (A, B) {
    fn write_key(&self, out: &mut String) {
        out.push('(');
        self.0.write_key(out);
        out.push('|');
        self.1.write_key(out);
        out.push(')');
    }
}

impl<T: SemanticKey + ?Sized> SemanticKey for &T {
    fn write_key(&self, out: &mut String) {
        (**self).write_key(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuple_key() {
        let tuple = AtomTuple::from(["a", "b"]);
        assert_eq!(tuple.semantic_key(), "<a,b>");
    }

    #[test]
    fn test_escaping_prevents_collisions() {
        let tricky = AtomTuple::from(["a,b"]);
        let plain = AtomTuple::from(["a", "b"]);
        assert_ne!(tricky.semantic_key(), plain.semantic_key());
        assert_eq!(tricky.semantic_key(), "<a\\,b>");
    }

    #[test]
    fn test_nested_flattening_shares_key() {
        let nested = AtomTuple::flatten([AtomTuple::from("a"), AtomTuple::from(["b", "c"])]);
        let flat = AtomTuple::from(["a", "b", "c"]);
        assert_eq!(nested.semantic_key(), flat.semantic_key());
    }

    #[test]
    fn test_pair_key() {
        let key = ("locatedIn".to_string(), AtomTuple::from(["p", "roomA"])).semantic_key();
        assert_eq!(key, "(locatedIn|<p,roomA>)");
    }
}

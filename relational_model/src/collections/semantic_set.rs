//! Semantic sets with a complement ("inverted") representation.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::SemanticKey;
use crate::error::{ModelError, Result};

/// A set whose membership is decided by [`SemanticKey`] equality.
///
/// An inverted set is the complement of its backing store: it contains every
/// value *except* the stored ones. Complements are views over the same
/// copy-on-write store, so [`invert`](Self::invert) is O(1). Only membership,
/// union and intersection are defined on inverted sets; anything that has to
/// enumerate members fails with [`ModelError::UnboundedSet`].
#[derive(Debug, Clone)]
pub struct SemanticSet<T> {
    members: Arc<BTreeMap<String, T>>,
    inverted: bool,
}

impl<T> Default for SemanticSet<T> {
    fn default() -> Self {
        Self {
            members: Arc::new(BTreeMap::new()),
            inverted: false,
        }
    }
}

impl<T: SemanticKey + Clone> SemanticSet<T> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The set of everything: the complement of the empty set.
    pub fn universe() -> Self {
        Self {
            members: Arc::new(BTreeMap::new()),
            inverted: true,
        }
    }

    fn from_members(members: BTreeMap<String, T>, inverted: bool) -> Self {
        Self {
            members: Arc::new(members),
            inverted,
        }
    }

    /// Whether this is a complement view.
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// The complement of this set, sharing the same backing store.
    pub fn invert(&self) -> Self {
        Self {
            members: Arc::clone(&self.members),
            inverted: !self.inverted,
        }
    }

    /// Add `value`. Returns whether membership changed.
    pub fn insert(&mut self, value: T) -> bool {
        let key = value.semantic_key();
        let members = Arc::make_mut(&mut self.members);
        if self.inverted {
            members.remove(&key).is_some()
        } else {
            members.insert(key, value).is_none()
        }
    }

    /// Remove `value`. Returns whether membership changed.
    pub fn remove(&mut self, value: &T) -> bool {
        let key = value.semantic_key();
        let members = Arc::make_mut(&mut self.members);
        if self.inverted {
            members.insert(key, value.clone()).is_none()
        } else {
            members.remove(&key).is_some()
        }
    }

    /// Membership test.
    pub fn contains(&self, value: &T) -> bool {
        self.contains_key(&value.semantic_key())
    }

    fn contains_key(&self, key: &str) -> bool {
        self.members.contains_key(key) != self.inverted
    }

    fn finite(&self, operation: &'static str) -> Result<&BTreeMap<String, T>> {
        if self.inverted {
            Err(ModelError::UnboundedSet { operation })
        } else {
            Ok(&self.members)
        }
    }

    /// Number of members.
    pub fn len(&self) -> Result<usize> {
        Ok(self.finite("count")?.len())
    }

    /// Whether the set has no members.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.finite("count")?.is_empty())
    }

    /// Iterate over members in canonical key order.
    pub fn iter(&self) -> Result<impl Iterator<Item = &T>> {
        Ok(self.finite("iterate")?.values())
    }

    /// The member with the smallest canonical key.
    pub fn first(&self) -> Result<Option<&T>> {
        Ok(self.finite("take from")?.values().next())
    }

    /// Members satisfying `predicate`.
    pub fn filter(&self, mut predicate: impl FnMut(&T) -> bool) -> Result<Self> {
        let members = self
            .finite("filter")?
            .iter()
            .filter(|entry| predicate(entry.1))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(Self::from_members(members, false))
    }

    /// Image of the set under `f`.
    pub fn map<U: SemanticKey + Clone>(&self, f: impl FnMut(&T) -> U) -> Result<SemanticSet<U>> {
        Ok(self.finite("map")?.values().map(f).collect())
    }

    /// Set union, computed on the backing stores by De Morgan's laws.
    pub fn union(&self, other: &Self) -> Self {
        match (self.inverted, other.inverted) {
            (false, false) => Self::from_members(merged(&self.members, &other.members), false),
            (false, true) => Self::from_members(without(&other.members, &self.members), true),
            (true, false) => Self::from_members(without(&self.members, &other.members), true),
            (true, true) => Self::from_members(shared(&self.members, &other.members), true),
        }
    }

    /// Set intersection, computed on the backing stores by De Morgan's laws.
    pub fn intersection(&self, other: &Self) -> Self {
        match (self.inverted, other.inverted) {
            (false, false) => Self::from_members(shared(&self.members, &other.members), false),
            (false, true) => Self::from_members(without(&self.members, &other.members), false),
            (true, false) => Self::from_members(without(&other.members, &self.members), false),
            (true, true) => Self::from_members(merged(&self.members, &other.members), true),
        }
    }

    /// Equal cardinality and equal intersection cardinality.
    ///
    /// Compared on backing stores, so complements of identical sets are
    /// identical too.
    pub fn identical(&self, other: &Self) -> bool {
        if self.inverted != other.inverted {
            return false;
        }
        if Arc::ptr_eq(&self.members, &other.members) {
            return true;
        }
        self.members.len() == other.members.len()
            && self
                .members
                .keys()
                .filter(|key| other.members.contains_key(*key))
                .count()
                == self.members.len()
    }
}

fn merged<T: Clone>(lhs: &BTreeMap<String, T>, rhs: &BTreeMap<String, T>) -> BTreeMap<String, T> {
    let mut out = lhs.clone();
    for (key, value) in rhs {
        out.entry(key.clone()).or_insert_with(|| value.clone());
    }
    out
}

fn shared<T: Clone>(lhs: &BTreeMap<String, T>, rhs: &BTreeMap<String, T>) -> BTreeMap<String, T> {
    lhs.iter()
        .filter(|(key, _)| rhs.contains_key(*key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn without<T: Clone>(lhs: &BTreeMap<String, T>, rhs: &BTreeMap<String, T>) -> BTreeMap<String, T> {
    lhs.iter()
        .filter(|(key, _)| !rhs.contains_key(*key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

impl<T: SemanticKey + Clone> FromIterator<T> for SemanticSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let members = iter
            .into_iter()
            .map(|value| (value.semantic_key(), value))
            .collect();
        Self::from_members(members, false)
    }
}

impl<T: SemanticKey + Clone> Extend<T> for SemanticSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T> SemanticKey for SemanticSet<T> {
    fn write_key(&self, out: &mut String) {
        if self.inverted {
            out.push('!');
        }
        out.push('{');
        // BTreeMap keys are already sorted, so the encoding is order independent.
        for (i, key) in self.members.keys().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(key);
        }
        out.push('}');
    }
}

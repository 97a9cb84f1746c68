//! Relations - named, fixed-arity predicate tables.

use crate::atoms::{Atom, AtomTuple};
use crate::collections::{SemanticMap, SemanticSet};
use crate::error::{ModelError, Result};

/// Every declared relation of a model, by name.
pub type RelationTable = SemanticMap<String, Relation>;

/// A named predicate of fixed arity over atoms.
///
/// Facts are stored as subject atom -> set of object tuples. A fact of a
/// unary relation has an empty object tuple.
#[derive(Debug, Clone)]
pub struct Relation {
    name: String,
    arity: usize,
    table: SemanticMap<Atom, SemanticSet<AtomTuple>>,
}

impl Relation {
    /// Create an empty relation. Arity must be at least one.
    pub fn new(name: impl Into<String>, arity: usize) -> Result<Self> {
        let name = name.into();
        if arity == 0 {
            return Err(ModelError::InvalidArity {
                relation: name,
                arity,
            });
        }
        Ok(Self {
            name,
            arity,
            table: SemanticMap::new(),
        })
    }

    /// The relation's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared arity.
    pub fn arity(&self) -> usize {
        self.arity
    }

    fn split<'t>(&self, tuple: &'t AtomTuple) -> Result<(&'t Atom, AtomTuple)> {
        match tuple.subject() {
            Some(subject) if tuple.len() == self.arity => Ok((subject, tuple.rest())),
            _ => Err(ModelError::ArityMismatch {
                relation: self.name.clone(),
                expected: self.arity,
                found: tuple.len(),
            }),
        }
    }

    /// Make the fact true. Returns whether the table changed.
    pub fn relate(&mut self, tuple: &AtomTuple) -> Result<bool> {
        let (subject, objects) = self.split(tuple)?;
        Ok(self
            .table
            .get_or_insert_with(subject.clone(), SemanticSet::new)
            .insert(objects))
    }

    /// Make the fact false. Returns whether the table changed.
    pub fn unrelate(&mut self, tuple: &AtomTuple) -> Result<bool> {
        let (subject, objects) = self.split(tuple)?;
        let Some(objects_for_subject) = self.table.get_mut(subject) else {
            return Ok(false);
        };
        let changed = objects_for_subject.remove(&objects);
        if matches!(objects_for_subject.is_empty(), Ok(true)) {
            self.table.remove(subject);
        }
        Ok(changed)
    }

    /// Whether the fact is true.
    pub fn check(&self, tuple: &AtomTuple) -> Result<bool> {
        let (subject, objects) = self.split(tuple)?;
        Ok(self
            .table
            .get(subject)
            .is_some_and(|set| set.contains(&objects)))
    }

    /// All object tuples related to `subject`.
    pub fn related_objects_for_subject(&self, subject: &Atom) -> SemanticSet<AtomTuple> {
        self.table.get(subject).cloned().unwrap_or_default()
    }

    /// One-atom tuples of every subject with at least one fact.
    pub fn subjects(&self) -> SemanticSet<AtomTuple> {
        self.table
            .iter()
            .filter(|(_, objects)| matches!(objects.is_empty(), Ok(false)))
            .map(|(subject, _)| AtomTuple::from(subject))
            .collect()
    }

    /// Every fact as a `(name, subject, objects...)` tuple.
    pub fn propositions(&self) -> SemanticSet<AtomTuple> {
        let name = Atom::new(&self.name);
        self.facts()
            .map(|fact| fact.prepend(name.clone()))
            .collect()
    }

    /// Every fact as a full tuple, subject first.
    pub fn facts(&self) -> impl Iterator<Item = AtomTuple> + '_ {
        self.table.iter().flat_map(|(subject, objects)| {
            objects
                .iter()
                .into_iter()
                .flatten()
                .map(move |object| object.prepend(subject))
        })
    }

    /// Total number of stored facts.
    pub fn fact_count(&self) -> usize {
        self.table
            .values()
            .map(|objects| objects.len().unwrap_or(0))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn located_in() -> Relation {
        Relation::new("locatedIn", 2).unwrap()
    }

    #[test]
    fn test_relate_and_check() {
        let mut rel = located_in();
        assert!(rel.relate(&AtomTuple::from(["p", "roomA"])).unwrap());
        assert!(rel.check(&AtomTuple::from(["p", "roomA"])).unwrap());
        assert!(!rel.check(&AtomTuple::from(["p", "roomB"])).unwrap());
    }

    #[test]
    fn test_relate_is_idempotent() {
        let mut rel = located_in();
        rel.relate(&AtomTuple::from(["p", "roomA"])).unwrap();
        assert!(!rel.relate(&AtomTuple::from(["p", "roomA"])).unwrap());
        assert_eq!(rel.fact_count(), 1);
        assert!(!rel.unrelate(&AtomTuple::from(["p", "roomB"])).unwrap());
    }

    #[test]
    fn test_arity_mismatch() {
        let mut rel = located_in();
        let err = rel.relate(&AtomTuple::from(["p"])).unwrap_err();
        assert!(matches!(err, ModelError::ArityMismatch { expected: 2, found: 1, .. }));
        assert!(rel.check(&AtomTuple::from(["p", "a", "b"])).is_err());
        assert!(rel.unrelate(&AtomTuple::empty()).is_err());
    }

    #[test]
    fn test_zero_arity_rejected() {
        assert!(matches!(
            Relation::new("nothing", 0),
            Err(ModelError::InvalidArity { arity: 0, .. })
        ));
    }

    #[test]
    fn test_subjects_only_nonempty() {
        let mut rel = located_in();
        rel.relate(&AtomTuple::from(["p", "roomA"])).unwrap();
        rel.relate(&AtomTuple::from(["q", "roomA"])).unwrap();
        rel.unrelate(&AtomTuple::from(["q", "roomA"])).unwrap();

        let subjects = rel.subjects();
        assert_eq!(subjects.len().unwrap(), 1);
        assert!(subjects.contains(&AtomTuple::from("p")));
    }

    #[test]
    fn test_unary_relation() {
        let mut exists = Relation::new("exists", 1).unwrap();
        exists.relate(&AtomTuple::from("bowl")).unwrap();
        assert!(exists.check(&AtomTuple::from("bowl")).unwrap());
        assert!(exists.subjects().contains(&AtomTuple::from("bowl")));
        assert!(exists
            .related_objects_for_subject(&Atom::new("bowl"))
            .contains(&AtomTuple::empty()));
    }

    #[test]
    fn test_propositions() {
        let mut rel = located_in();
        rel.relate(&AtomTuple::from(["p", "roomA"])).unwrap();
        let props = rel.propositions();
        assert!(props.contains(&AtomTuple::from(["locatedIn", "p", "roomA"])));
    }

    #[test]
    fn test_clone_is_deep() {
        let mut rel = located_in();
        rel.relate(&AtomTuple::from(["p", "roomA"])).unwrap();
        let snapshot = rel.clone();
        rel.relate(&AtomTuple::from(["p", "roomB"])).unwrap();
        assert!(!snapshot.check(&AtomTuple::from(["p", "roomB"])).unwrap());
        assert_eq!(snapshot.fact_count(), 1);
    }

    #[test]
    fn test_related_objects() {
        let mut rel = located_in();
        rel.relate(&AtomTuple::from(["p", "roomA"])).unwrap();
        rel.relate(&AtomTuple::from(["p", "roomB"])).unwrap();
        let objects = rel.related_objects_for_subject(&Atom::new("p"));
        assert_eq!(objects.len().unwrap(), 2);
        assert!(rel
            .related_objects_for_subject(&Atom::new("nobody"))
            .is_empty()
            .unwrap());
    }
}

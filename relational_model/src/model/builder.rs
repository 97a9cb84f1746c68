//! Model construction.

use std::sync::Arc;

use super::{Declarations, DerivedRelation, Model};
use crate::atoms::Atom;
use crate::collections::{SemanticMap, SemanticSet};
use crate::error::{ModelError, Result};
use crate::invariants::Invariant;
use crate::query::{EventBatch, QueryExpr};
use crate::relation::{Relation, RelationTable};

/// Collects declarations and validates them into a [`Model`].
#[derive(Debug, Default)]
pub struct ModelBuilder {
    atoms: Vec<Atom>,
    relations: Vec<(String, usize)>,
    invariants: Vec<Invariant>,
    derived: Vec<DerivedRelation>,
    initial: Vec<EventBatch>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one atom to the universe.
    pub fn atom(mut self, atom: impl Into<Atom>) -> Self {
        self.atoms.push(atom.into());
        self
    }

    /// Add atoms to the universe.
    pub fn atoms(mut self, atoms: impl IntoIterator<Item = impl Into<Atom>>) -> Self {
        self.atoms.extend(atoms.into_iter().map(Into::into));
        self
    }

    /// Declare a base relation.
    pub fn relation(mut self, name: impl Into<String>, arity: usize) -> Self {
        self.relations.push((name.into(), arity));
        self
    }

    /// Declare several base relations.
    pub fn relations(mut self, decls: impl IntoIterator<Item = (impl Into<String>, usize)>) -> Self {
        self.relations
            .extend(decls.into_iter().map(|(name, arity)| (name.into(), arity)));
        self
    }

    /// Declare an invariant over base relations.
    pub fn invariant(mut self, invariant: Invariant) -> Self {
        self.invariants.push(invariant);
        self
    }

    /// Declare a derived relation from a query-building closure.
    pub fn derived(
        self,
        name: impl Into<String>,
        arity: usize,
        builder: impl Fn(&Atom) -> QueryExpr + Send + Sync + 'static,
    ) -> Self {
        self.derived_relation(DerivedRelation::new(name, arity, builder))
    }

    /// Declare a derived relation from a `$subject` template.
    pub fn derived_template(self, name: impl Into<String>, arity: usize, template: QueryExpr) -> Self {
        self.derived_relation(DerivedRelation::from_template(name, arity, template))
    }

    pub fn derived_relation(mut self, relation: DerivedRelation) -> Self {
        self.derived.push(relation);
        self
    }

    /// Facts asserted right after construction, in order.
    pub fn initial_facts(mut self, batch: EventBatch) -> Self {
        self.initial.push(batch);
        self
    }

    /// Validate the declarations and build an open model.
    pub fn build(self) -> Result<Model> {
        let mut relations = RelationTable::new();
        for (name, arity) in self.relations {
            if relations.contains_key(name.as_str()) {
                return Err(ModelError::DuplicateRelation(name));
            }
            let relation = Relation::new(name.clone(), arity)?;
            relations.insert(name, relation);
        }

        let mut derived = SemanticMap::new();
        for relation in self.derived {
            let name = relation.name().to_string();
            if relations.contains_key(name.as_str()) || derived.contains_key(name.as_str()) {
                return Err(ModelError::DuplicateRelation(name));
            }
            if relation.arity() == 0 {
                return Err(ModelError::InvalidArity {
                    relation: name,
                    arity: 0,
                });
            }
            derived.insert(name, relation);
        }

        for invariant in &self.invariants {
            invariant.validate(&relations)?;
        }

        let atoms: SemanticSet<Atom> = self.atoms.into_iter().collect();
        tracing::debug!(
            atoms = atoms.len().unwrap_or(0),
            relations = relations.len(),
            invariants = self.invariants.len(),
            derived = derived.len(),
            "built model"
        );

        let mut model = Model {
            declarations: Arc::new(Declarations {
                atoms,
                invariants: self.invariants,
                derived,
            }),
            relations,
            parent: None,
            memo: None,
        };
        for batch in &self.initial {
            model.assert(batch)?;
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_relation() {
        let err = Model::builder()
            .relation("locatedIn", 2)
            .relation("locatedIn", 2)
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateRelation(name) if name == "locatedIn"));

        let err = Model::builder()
            .relation("canTake", 2)
            .derived("canTake", 2, |s| QueryExpr::which("possesses", s))
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateRelation(_)));
    }

    #[test]
    fn test_invariant_validation() {
        let err = Model::builder()
            .relation("exists", 1)
            .invariant(Invariant::symmetric("exists"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidInvariant { kind: "symmetric", .. }));

        let err = Model::builder()
            .relation("locatedIn", 2)
            .invariant(Invariant::converse("locatedIn", "locusOf"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::UnknownRelation(name) if name == "locusOf"));
    }

    #[test]
    fn test_zero_arity() {
        assert!(Model::builder().relation("nothing", 0).build().is_err());
        assert!(Model::builder()
            .derived("nothing", 0, |_| QueryExpr::and([]))
            .build()
            .is_err());
    }

    #[test]
    fn test_initial_facts() {
        let model = Model::builder()
            .atoms(["door"])
            .relation("isOpen", 1)
            .initial_facts(EventBatch::new().relate("isOpen", "door"))
            .build()
            .unwrap();
        assert!(model.check("isOpen", "door").unwrap());
    }
}

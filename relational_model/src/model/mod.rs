//! Models - relation contents plus the declarations they are checked against.
//!
//! A [`Model`] owns its relation tables. Everything declared at build time
//! (atom universe, invariants, derived relations) lives behind an `Arc` and
//! is shared by every model derived from the same build, so
//! [`child`](Model::child) only copies relation contents.
//!
//! Freezing consumes the model into an `Arc<Model>` and enables query
//! memoization. A frozen model rejects [`assert`](Model::assert), which is
//! what keeps its cache valid forever.

mod builder;
mod derived;
mod eval;

pub use builder::*;
pub use derived::*;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::atoms::{Atom, AtomTuple};
use crate::collections::{SemanticMap, SemanticSet};
use crate::error::{ModelError, Result};
use crate::invariants::{Invariant, Trigger, TriggerBatch};
use crate::query::{EventBatch, QueryArg, QueryExpr, QueryValue, Statement};
use crate::relation::{Relation, RelationTable};
use crate::resolution::ResolutionCycle;

/// Declarations fixed at build time.
#[derive(Debug)]
struct Declarations {
    atoms: SemanticSet<Atom>,
    invariants: Vec<Invariant>,
    derived: SemanticMap<String, DerivedRelation>,
}

/// Results of a frozen model, keyed by the JSON encoding of the expression.
#[derive(Debug, Default)]
struct QueryCache {
    entries: Mutex<HashMap<String, QueryValue>>,
}

impl QueryCache {
    fn get(&self, key: &str) -> Option<QueryValue> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Store `value` unless another reader got there first; returns the stored value.
    fn insert(&self, key: String, value: QueryValue) -> QueryValue {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(value)
            .clone()
    }

    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Relation contents under a fixed set of declarations.
pub struct Model {
    declarations: Arc<Declarations>,
    relations: RelationTable,
    parent: Option<Arc<Model>>,
    /// Present only once frozen.
    memo: Option<QueryCache>,
}

impl Model {
    /// Start declaring a model.
    pub fn builder() -> ModelBuilder {
        ModelBuilder::new()
    }

    /// Whether the model has been frozen.
    pub fn is_frozen(&self) -> bool {
        self.memo.is_some()
    }

    /// Freeze the model, enabling query memoization.
    pub fn freeze(mut self) -> Arc<Model> {
        self.memo = Some(QueryCache::default());
        Arc::new(self)
    }

    /// An open copy of this model's relation contents whose parent is `self`.
    pub fn child(self: &Arc<Self>) -> Model {
        Model {
            declarations: Arc::clone(&self.declarations),
            relations: self.relations.clone(),
            parent: Some(Arc::clone(self)),
            memo: None,
        }
    }

    /// The model this one was derived from.
    pub fn parent(&self) -> Option<&Arc<Model>> {
        self.parent.as_ref()
    }

    /// The atom universe.
    pub fn atoms(&self) -> &SemanticSet<Atom> {
        &self.declarations.atoms
    }

    /// Whether `atom` belongs to the universe.
    pub fn has_atom(&self, atom: &Atom) -> bool {
        self.declarations.atoms.contains(atom)
    }

    /// A base relation by name.
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    /// A derived relation by name.
    pub fn derived_relation(&self, name: &str) -> Option<&DerivedRelation> {
        self.declarations.derived.get(name)
    }

    /// The declared invariants.
    pub fn invariants(&self) -> &[Invariant] {
        &self.declarations.invariants
    }

    /// Declared arity of a base or derived relation.
    pub fn arity(&self, name: &str) -> Result<usize> {
        if let Some(relation) = self.relations.get(name) {
            return Ok(relation.arity());
        }
        self.declarations
            .derived
            .get(name)
            .map(DerivedRelation::arity)
            .ok_or_else(|| ModelError::UnknownRelation(name.to_string()))
    }

    /// Number of stored facts across all base relations.
    pub fn fact_count(&self) -> usize {
        self.relations.values().map(Relation::fact_count).sum()
    }

    /// Number of memoized query results; zero while open.
    pub fn cached_queries(&self) -> usize {
        self.memo.as_ref().map_or(0, QueryCache::len)
    }

    /// Apply `batch` through one resolution cycle.
    ///
    /// Nested queries in statement arguments are evaluated against the model
    /// as it was before the batch. The cycle runs on a copy of the relation
    /// tables, so a failure leaves the model unchanged. Returns the number of
    /// facts whose truth value changed.
    pub fn assert(&mut self, batch: &EventBatch) -> Result<usize> {
        if self.is_frozen() {
            return Err(ModelError::FrozenMutation);
        }
        let triggers = TriggerBatch {
            relate: self.resolve_statements(&batch.relate)?,
            unrelate: self.resolve_statements(&batch.unrelate)?,
        };

        let mut staged = self.relations.clone();
        let changed = ResolutionCycle::new(&mut staged, &self.declarations.invariants)
            .run(triggers)?;
        self.relations = staged;
        Ok(changed)
    }

    fn resolve_statements(&self, statements: &[Statement]) -> Result<Vec<Trigger>> {
        statements
            .iter()
            .map(|statement| self.resolve_statement(statement))
            .collect()
    }

    fn resolve_statement(&self, statement: &Statement) -> Result<Trigger> {
        let name = statement.relation();
        if self.declarations.derived.contains_key(name) {
            return Err(ModelError::ReadOnlyRelation(name.to_string()));
        }
        let relation = self
            .relations
            .get(name)
            .ok_or_else(|| ModelError::UnknownRelation(name.to_string()))?;
        let tuple = self
            .resolve_tuple("assert", statement.argument())?
            .ok_or_else(|| ModelError::QueryTypeMismatch {
                clause: "assert",
                reason: format!("argument for `{name}` resolved to nothing"),
            })?;
        self.ensure_known(&tuple)?;
        if tuple.len() != relation.arity() {
            return Err(ModelError::ArityMismatch {
                relation: name.to_string(),
                expected: relation.arity(),
                found: tuple.len(),
            });
        }
        Ok(Trigger::new(name, tuple))
    }

    fn ensure_known(&self, tuple: &AtomTuple) -> Result<()> {
        match tuple.iter().find(|atom| !self.has_atom(atom)) {
            Some(atom) => Err(ModelError::UnknownAtom(atom.to_string())),
            None => Ok(()),
        }
    }

    /// Evaluate a query expression.
    ///
    /// On a frozen model every result is memoized by the expression's
    /// encoding. The cache lock is never held while evaluating.
    pub fn query(&self, expr: &QueryExpr) -> Result<QueryValue> {
        let Some(memo) = &self.memo else {
            return self.evaluate(expr);
        };
        let key = expr.to_json()?;
        if let Some(hit) = memo.get(&key) {
            tracing::trace!(clause = expr.clause(), "query cache hit");
            return Ok(hit);
        }
        let value = self.evaluate(expr)?;
        Ok(memo.insert(key, value))
    }

    /// Whether `relation(tuple)` holds.
    pub fn check(&self, relation: &str, tuple: impl Into<QueryArg>) -> Result<bool> {
        let value = self.query(&QueryExpr::check(relation, tuple))?;
        Ok(value.truthy())
    }

    /// Object tuples related to `subject`.
    pub fn which(&self, relation: &str, subject: impl Into<QueryArg>) -> Result<SemanticSet<AtomTuple>> {
        self.query(&QueryExpr::which(relation, subject))?
            .into_set("which")
    }

    /// The first object tuple related to `subject`, if any.
    pub fn first_which(&self, relation: &str, subject: impl Into<QueryArg>) -> Result<Option<AtomTuple>> {
        let value = self.query(&QueryExpr::first_which(relation, subject))?;
        Ok(value.as_tuple().cloned())
    }

    /// Subjects with at least one fact.
    pub fn subjects(&self, relation: &str) -> Result<SemanticSet<AtomTuple>> {
        self.query(&QueryExpr::subjects(relation))?
            .into_set("subjects")
    }

    /// Every fact as a `(relation, subject, objects...)` tuple.
    pub fn propositions(&self, relation: &str) -> Result<SemanticSet<AtomTuple>> {
        self.query(&QueryExpr::propositions(relation))?
            .into_set("propositions")
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("relations", &self.relations.len())
            .field("facts", &self.fact_count())
            .field("frozen", &self.is_frozen())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl Drop for Model {
    /// Unlink the parent chain iteratively; long histories would otherwise
    /// be freed recursively, one stack frame per ancestor.
    fn drop(&mut self) {
        let mut parent = self.parent.take();
        while let Some(model) = parent {
            match Arc::try_unwrap(model) {
                Ok(mut model) => parent = model.parent.take(),
                Err(_) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rooms() -> Model {
        Model::builder()
            .atoms(["p", "q", "roomA", "roomB", "key"])
            .relation("locatedIn", 2)
            .relation("locusOf", 2)
            .relation("possesses", 2)
            .invariant(Invariant::unique("locatedIn"))
            .invariant(Invariant::converse("locatedIn", "locusOf"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_assert_and_which() {
        let mut model = rooms();
        model
            .assert(&EventBatch::new().relate("locatedIn", ["p", "roomA"]))
            .unwrap();
        model
            .assert(&EventBatch::new().relate("locatedIn", ["p", "roomB"]))
            .unwrap();

        let which = model.which("locatedIn", "p").unwrap();
        assert_eq!(which.len().unwrap(), 1);
        assert!(which.contains(&AtomTuple::from("roomB")));
        assert!(!model.which("locusOf", "roomA").unwrap().contains(&AtomTuple::from("p")));
        assert!(model.which("locusOf", "roomB").unwrap().contains(&AtomTuple::from("p")));
    }

    #[test]
    fn test_failed_assert_is_atomic() {
        let mut model = rooms();
        let batch = EventBatch::new()
            .relate("possesses", ["p", "key"])
            .relate("locatedIn", ["p", "roomA"])
            .unrelate("locatedIn", ["p", "roomA"]);
        assert!(matches!(
            model.assert(&batch),
            Err(ModelError::Contradiction { .. })
        ));
        assert_eq!(model.fact_count(), 0);
    }

    #[test]
    fn test_statement_errors() {
        let mut model = Model::builder()
            .atoms(["p", "roomA"])
            .relation("locatedIn", 2)
            .derived("isHere", 1, |s| {
                QueryExpr::check("locatedIn", vec![QueryArg::from(s), QueryArg::from("roomA")])
            })
            .build()
            .unwrap();

        let err = model
            .assert(&EventBatch::new().relate("locatedIn", ["p", "nowhere"]))
            .unwrap_err();
        assert!(matches!(err, ModelError::UnknownAtom(atom) if atom == "nowhere"));

        let err = model
            .assert(&EventBatch::new().relate("locatedIn", ["p"]))
            .unwrap_err();
        assert!(matches!(err, ModelError::ArityMismatch { expected: 2, found: 1, .. }));

        let err = model
            .assert(&EventBatch::new().relate("isHere", "p"))
            .unwrap_err();
        assert!(matches!(err, ModelError::ReadOnlyRelation(_)));

        let err = model
            .assert(&EventBatch::new().relate("missing", "p"))
            .unwrap_err();
        assert!(matches!(err, ModelError::UnknownRelation(_)));
    }

    #[test]
    fn test_statement_argument_uses_pre_mutation_model() {
        let mut model = rooms();
        model
            .assert(&EventBatch::new().relate("locatedIn", ["p", "roomA"]))
            .unwrap();

        // q goes wherever p is *before* p moves.
        let batch = EventBatch::from_json(
            r#"{"relate": [
                ["locatedIn", ["p", "roomB"]],
                ["locatedIn", ["q", {"firstWhich": ["locatedIn", "p"]}]]
            ]}"#,
        )
        .unwrap();
        model.assert(&batch).unwrap();
        assert!(model.check("locatedIn", ["q", "roomA"]).unwrap());
        assert!(model.check("locatedIn", ["p", "roomB"]).unwrap());
    }

    #[test]
    fn test_frozen_rejects_assert() {
        let frozen = rooms().freeze();
        let mut copy = Arc::try_unwrap(frozen).unwrap();
        assert!(copy.is_frozen());
        assert!(matches!(
            copy.assert(&EventBatch::new().relate("locatedIn", ["p", "roomA"])),
            Err(ModelError::FrozenMutation)
        ));
    }

    #[test]
    fn test_child_isolation() {
        let mut model = rooms();
        model
            .assert(&EventBatch::new().relate("locatedIn", ["p", "roomA"]))
            .unwrap();
        let parent = model.freeze();
        let before = parent.which("locatedIn", "p").unwrap();

        let mut child = parent.child();
        child
            .assert(&EventBatch::new().relate("locatedIn", ["p", "roomB"]))
            .unwrap();

        assert!(child.check("locatedIn", ["p", "roomB"]).unwrap());
        assert!(parent.which("locatedIn", "p").unwrap().identical(&before));
        assert!(!parent.check("locatedIn", ["p", "roomB"]).unwrap());
        assert!(child.parent().is_some());
    }

    #[test]
    fn test_frozen_queries_are_memoized() {
        let frozen = rooms().freeze();
        assert_eq!(frozen.cached_queries(), 0);
        frozen.subjects("locatedIn").unwrap();
        frozen.subjects("locatedIn").unwrap();
        assert_eq!(frozen.cached_queries(), 1);

        let open = rooms();
        open.subjects("locatedIn").unwrap();
        assert_eq!(open.cached_queries(), 0);
    }

    #[test]
    fn test_drop_long_history() {
        let mut current = rooms().freeze();
        for _ in 0..100_000 {
            current = current.child().freeze();
        }
        assert!(current.parent().is_some());
        drop(current);
    }

    #[test]
    fn test_drop_keeps_shared_ancestors() {
        let root = rooms().freeze();
        let mut current = root.child().freeze();
        for _ in 0..10 {
            current = current.child().freeze();
        }
        drop(current);
        assert_eq!(Arc::strong_count(&root), 1);
        assert!(root.which("locatedIn", "p").unwrap().is_empty().unwrap());
    }
}

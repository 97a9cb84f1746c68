//! Worlds - immutable, version-stamped snapshots of a model.
//!
//! Every transition clones the current model, runs the caller's batch and
//! any observer rounds on the clone, freezes it, and wraps it in a new
//! [`World`] whose parent is the old one. Nothing reachable from an existing
//! world is ever mutated except the concept ledgers.

mod transition;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use relational_model::{Atom, AtomTuple, EventBatch, Model, QueryArg, QueryExpr, QueryValue, SemanticSet};

use crate::concept::{Concept, ConceptTable, SealedWorld, StateValue, VersionView};
use crate::config::WorldConfig;
use crate::error::{Result, WorldError};
use crate::observer::Observer;
use crate::sequence::{LineageId, Uid, UidSequence};

use transition::{run_transition, PendingVersion};

/// State shared by every world of one lineage.
#[derive(Debug)]
struct Lineage {
    id: LineageId,
    observers: Vec<Observer>,
    concepts: ConceptTable,
    sequence: UidSequence,
    config: WorldConfig,
}

/// An immutable snapshot of a model, stamped with a uid.
#[derive(Debug)]
pub struct World {
    uid: Uid,
    model: Arc<Model>,
    parent: Option<Arc<World>>,
    lineage: Arc<Lineage>,
    last_event: EventBatch,
    observer_rounds: usize,
    committed: AtomicBool,
}

/// Everything a lineage needs before its first world exists.
#[derive(Debug)]
pub struct WorldBuilder {
    model: Model,
    observers: Vec<Observer>,
    concepts: ConceptTable,
    sequence: UidSequence,
    config: WorldConfig,
}

impl WorldBuilder {
    /// Start a lineage over `model`.
    pub fn new(model: Model) -> Self {
        Self {
            model,
            observers: Vec::new(),
            concepts: ConceptTable::new(),
            sequence: UidSequence::new(),
            config: WorldConfig::default(),
        }
    }

    /// Add an observer.
    pub fn with_observer(mut self, observer: impl Into<Observer>) -> Self {
        self.observers.push(observer.into());
        self
    }

    /// Use `concepts` as the lineage's concept table.
    pub fn with_concepts(mut self, concepts: ConceptTable) -> Self {
        self.concepts = concepts;
        self
    }

    /// Draw uids from `sequence`.
    pub fn with_sequence(mut self, sequence: UidSequence) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_config(mut self, config: WorldConfig) -> Self {
        self.config = config;
        self
    }

    /// Create the first world by applying `batch` to the model.
    pub fn genesis(self, batch: &EventBatch) -> Result<Arc<World>> {
        let lineage = Arc::new(Lineage {
            id: LineageId::new(),
            observers: self.observers,
            concepts: self.concepts,
            sequence: self.sequence,
            config: self.config,
        });
        let pending = PendingVersion {
            uid: lineage.sequence.next_uid(),
            lineage: lineage.id,
            parent: None,
        };
        let (model, observer_rounds) = run_transition(self.model, &pending, &lineage, batch)?;

        tracing::info!(
            uid = %pending.uid,
            lineage = %lineage.id,
            facts = model.fact_count(),
            "created genesis world"
        );
        Ok(Arc::new(World {
            uid: pending.uid,
            model: model.freeze(),
            parent: None,
            lineage,
            last_event: batch.clone(),
            observer_rounds,
            committed: AtomicBool::new(false),
        }))
    }
}

impl Drop for World {
    /// Unlink the ancestry iteratively so dropping the head of a long
    /// lineage does not recurse once per ancestor.
    fn drop(&mut self) {
        let mut parent = self.parent.take();
        while let Some(world) = parent {
            match Arc::try_unwrap(world) {
                Ok(mut world) => parent = world.parent.take(),
                Err(_) => break,
            }
        }
    }
}

impl World {
    /// Start a lineage over `model`.
    pub fn builder(model: Model) -> WorldBuilder {
        WorldBuilder::new(model)
    }

    /// A child world with `batch` applied.
    ///
    /// The batch and any observer output run on a copy of this world's model;
    /// on failure no world is created and this one is unaffected.
    pub fn event(self: &Arc<Self>, batch: &EventBatch) -> Result<Arc<World>> {
        let pending = PendingVersion {
            uid: self.lineage.sequence.next_uid(),
            lineage: self.lineage.id,
            parent: Some(self.as_ref()),
        };
        let (model, observer_rounds) =
            run_transition(self.model.child(), &pending, &self.lineage, batch)?;

        tracing::debug!(
            uid = %pending.uid,
            parent = %self.uid,
            observer_rounds,
            "created world"
        );
        Ok(Arc::new(World {
            uid: pending.uid,
            model: model.freeze(),
            parent: Some(Arc::clone(self)),
            lineage: Arc::clone(&self.lineage),
            last_event: batch.clone(),
            observer_rounds,
            committed: AtomicBool::new(false),
        }))
    }

    /// Commit this world's entity state if it is not committed yet, then
    /// apply `batch`.
    ///
    /// If the transition fails the commit is undone, leaving this world as
    /// it was before the call.
    pub fn next(self: &Arc<Self>, batch: &EventBatch) -> Result<Arc<World>> {
        if self.is_committed() {
            return self.event(batch);
        }
        let sealed = self.seal()?;
        match self.event(batch) {
            Ok(world) => Ok(world),
            Err(error) => {
                sealed.revert();
                self.committed.store(false, Ordering::SeqCst);
                tracing::debug!(uid = %self.uid, %error, "reverted commit after failed transition");
                Err(error)
            }
        }
    }

    /// Seal the entity state of every concept as of this world.
    ///
    /// Either every stateful concept commits or none does.
    pub fn commit(&self) -> Result<()> {
        self.seal().map(drop)
    }

    fn seal(&self) -> Result<SealedWorld> {
        if self.is_committed() {
            return Err(WorldError::WorldAlreadyCommitted { uid: self.uid });
        }
        let sealed = self.lineage.concepts.seal_world(self)?;
        self.committed.store(true, Ordering::SeqCst);
        tracing::debug!(uid = %self.uid, "committed world");
        Ok(sealed)
    }

    pub fn is_committed(&self) -> bool {
        self.committed.load(Ordering::SeqCst)
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn lineage(&self) -> LineageId {
        self.lineage.id
    }

    pub fn parent(&self) -> Option<&Arc<World>> {
        self.parent.as_ref()
    }

    /// The frozen model snapshot.
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// The batch that produced this world.
    pub fn last_event(&self) -> &EventBatch {
        &self.last_event
    }

    /// Observer rounds run while producing this world.
    pub fn observer_rounds(&self) -> usize {
        self.observer_rounds
    }

    pub fn config(&self) -> &WorldConfig {
        &self.lineage.config
    }

    /// This world followed by its ancestors, newest first.
    pub fn ancestry(&self) -> impl Iterator<Item = &World> {
        std::iter::successors(Some(self), |world| world.parent.as_deref())
    }

    /// Whether `uid` is this world or one of its ancestors.
    pub fn descends_from(&self, uid: Uid) -> bool {
        // Ancestors always have smaller uids.
        self.ancestry()
            .take_while(|world| world.uid >= uid)
            .any(|world| world.uid == uid)
    }

    /// The concept registered for `atom`.
    pub fn concept(&self, atom: impl Into<Atom>) -> Result<&Arc<Concept>> {
        self.lineage.concepts.get(&atom.into())
    }

    /// Read a concept's state as of this world.
    pub fn state(&self, atom: impl Into<Atom>, key: &str) -> Result<StateValue> {
        self.concept(atom)?.get_state(self, key)
    }

    /// Set a concept's state for this (uncommitted) world.
    pub fn set_state(&self, atom: impl Into<Atom>, key: &str, value: impl Into<StateValue>) -> Result<()> {
        self.concept(atom)?.set_state(self, key, value)
    }

    /// Evaluate a query against this world's model.
    pub fn query(&self, expr: &QueryExpr) -> Result<QueryValue> {
        Ok(self.model.query(expr)?)
    }

    pub fn check(&self, relation: &str, tuple: impl Into<QueryArg>) -> Result<bool> {
        Ok(self.model.check(relation, tuple)?)
    }

    pub fn which(&self, relation: &str, subject: impl Into<QueryArg>) -> Result<SemanticSet<AtomTuple>> {
        Ok(self.model.which(relation, subject)?)
    }

    pub fn first_which(&self, relation: &str, subject: impl Into<QueryArg>) -> Result<Option<AtomTuple>> {
        Ok(self.model.first_which(relation, subject)?)
    }

    pub fn subjects(&self, relation: &str) -> Result<SemanticSet<AtomTuple>> {
        Ok(self.model.subjects(relation)?)
    }

    pub fn propositions(&self, relation: &str) -> Result<SemanticSet<AtomTuple>> {
        Ok(self.model.propositions(relation)?)
    }

    /// The atom universe.
    pub fn atoms(&self) -> &SemanticSet<Atom> {
        self.model.atoms()
    }
}

impl VersionView for World {
    fn uid(&self) -> Uid {
        self.uid
    }

    fn lineage(&self) -> LineageId {
        self.lineage.id
    }

    fn descends_from(&self, uid: Uid) -> bool {
        World::descends_from(self, uid)
    }
}

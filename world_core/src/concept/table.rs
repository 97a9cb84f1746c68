//! Concept tables - the concepts shared by every world of a lineage.

use std::sync::Arc;

use relational_model::{Atom, SemanticMap};

use super::{Concept, Unseal, VersionView};
use crate::error::{Result, WorldError};

/// Concepts by atom.
#[derive(Debug, Clone, Default)]
pub struct ConceptTable {
    concepts: SemanticMap<Atom, Arc<Concept>>,
}

impl ConceptTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a concept. Each atom can be registered once.
    pub fn register(&mut self, concept: Concept) -> Result<Arc<Concept>> {
        if self.concepts.contains_key(concept.atom()) {
            return Err(WorldError::DuplicateConcept(concept.atom().to_string()));
        }
        let concept = Arc::new(concept);
        self.concepts
            .insert(concept.atom().clone(), Arc::clone(&concept));
        Ok(concept)
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, concept: Concept) -> Result<Self> {
        self.register(concept)?;
        Ok(self)
    }

    /// The concept for `atom`.
    pub fn get(&self, atom: &Atom) -> Result<&Arc<Concept>> {
        self.concepts
            .get(atom)
            .ok_or_else(|| WorldError::UnknownConcept(atom.to_string()))
    }

    pub fn contains(&self, atom: &Atom) -> bool {
        self.concepts.contains_key(atom)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Concept>> {
        self.concepts.values()
    }

    /// Commit `world` on every stateful concept, or on none of them.
    pub fn commit_world(&self, world: &dyn VersionView) -> Result<()> {
        self.seal_world(world).map(drop)
    }

    /// [`commit_world`](Self::commit_world) that can be reverted with
    /// [`SealedWorld::revert`].
    pub(crate) fn seal_world(&self, world: &dyn VersionView) -> Result<SealedWorld> {
        let stateful = || self.iter().filter(|concept| concept.has_state());
        for concept in stateful() {
            concept.validate_commit(world)?;
        }
        let mut sealed = SealedWorld { undo: Vec::new() };
        for concept in stateful() {
            match concept.seal(world) {
                Ok(undo) => sealed.undo.push((Arc::clone(concept), undo)),
                Err(error) => {
                    sealed.revert();
                    return Err(error);
                }
            }
        }
        Ok(sealed)
    }
}

/// A world commit across a concept table that has not been kept yet.
#[derive(Debug)]
pub(crate) struct SealedWorld {
    undo: Vec<(Arc<Concept>, Unseal)>,
}

impl SealedWorld {
    /// Undo the commit, newest concept first.
    pub(crate) fn revert(self) {
        for (concept, undo) in self.undo.into_iter().rev() {
            concept.unseal(undo);
        }
    }
}

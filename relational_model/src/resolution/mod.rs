//! Resolution cycle - drives invariants to a fixpoint over one batch.
//!
//! Triggers are applied in insertion order. Whatever an invariant emits for a
//! trigger is applied depth-first, before the next sibling trigger, so the
//! outcome is deterministic when several invariants interact.
//!
//! Every trigger runs its hooks even when the fact it names is already in
//! the requested state. Invariants may depend on the attempted change rather
//! than on the resulting delta.

use crate::collections::SemanticSet;
use crate::error::{ModelError, Result};
use crate::invariants::{Invariant, Trigger, TriggerBatch};
use crate::relation::RelationTable;

/// One run of the invariant fixpoint over a set of relation tables.
pub struct ResolutionCycle<'a> {
    relations: &'a mut RelationTable,
    invariants: &'a [Invariant],
    related: SemanticSet<Trigger>,
    unrelated: SemanticSet<Trigger>,
    changed: usize,
}

#[derive(Clone, Copy)]
enum Direction {
    Relate,
    Unrelate,
}

impl<'a> ResolutionCycle<'a> {
    /// Create a cycle mutating `relations` under `invariants`.
    pub fn new(relations: &'a mut RelationTable, invariants: &'a [Invariant]) -> Self {
        Self {
            relations,
            invariants,
            related: SemanticSet::new(),
            unrelated: SemanticSet::new(),
            changed: 0,
        }
    }

    /// Apply `batch` and everything it triggers.
    ///
    /// Returns the number of facts whose truth value changed. On error the
    /// tables are left partially updated, so callers stage the cycle on a
    /// copy.
    pub fn run(mut self, batch: TriggerBatch) -> Result<usize> {
        tracing::trace!(
            relate = batch.relate.len(),
            unrelate = batch.unrelate.len(),
            "starting resolution cycle"
        );
        self.apply(batch)?;
        tracing::debug!(
            changed = self.changed,
            triggers = self.related.len().unwrap_or(0) + self.unrelated.len().unwrap_or(0),
            "resolution cycle reached fixpoint"
        );
        Ok(self.changed)
    }

    fn apply(&mut self, batch: TriggerBatch) -> Result<()> {
        for trigger in batch.relate {
            self.process(trigger, Direction::Relate)?;
        }
        for trigger in batch.unrelate {
            self.process(trigger, Direction::Unrelate)?;
        }
        Ok(())
    }

    fn process(&mut self, trigger: Trigger, direction: Direction) -> Result<()> {
        let (applied, opposite) = match direction {
            Direction::Relate => (&self.related, &self.unrelated),
            Direction::Unrelate => (&self.unrelated, &self.related),
        };
        if opposite.contains(&trigger) {
            tracing::debug!(trigger = %trigger, "contradictory triggers");
            return Err(ModelError::Contradiction {
                relation: trigger.relation,
                tuple: trigger.tuple.to_string(),
            });
        }
        if applied.contains(&trigger) {
            return Ok(());
        }
        match direction {
            Direction::Relate => self.related.insert(trigger.clone()),
            Direction::Unrelate => self.unrelated.insert(trigger.clone()),
        };

        let Trigger { relation, tuple } = &trigger;
        let invariants = self.invariants;

        for invariant in invariants {
            let emitted = match direction {
                Direction::Relate => invariant.before_relate(self.relations, relation, tuple)?,
                Direction::Unrelate => invariant.before_unrelate(self.relations, relation, tuple)?,
            };
            self.apply(emitted)?;
        }

        let table = self
            .relations
            .get_mut(relation.as_str())
            .ok_or_else(|| ModelError::UnknownRelation(relation.clone()))?;
        let changed = match direction {
            Direction::Relate => table.relate(tuple)?,
            Direction::Unrelate => table.unrelate(tuple)?,
        };
        if changed {
            self.changed += 1;
        }
        tracing::trace!(trigger = %trigger, changed, "applied trigger");

        for invariant in invariants {
            let emitted = match direction {
                Direction::Relate => invariant.after_relate(self.relations, relation, tuple)?,
                Direction::Unrelate => invariant.after_unrelate(self.relations, relation, tuple)?,
            };
            self.apply(emitted)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::AtomTuple;
    use crate::relation::Relation;

    fn table(decls: &[(&str, usize)]) -> RelationTable {
        decls
            .iter()
            .map(|(name, arity)| (name.to_string(), Relation::new(*name, *arity).unwrap()))
            .collect()
    }

    fn check(relations: &RelationTable, name: &str, tuple: &[&str]) -> bool {
        relations
            .get(name)
            .unwrap()
            .check(&AtomTuple::new(tuple.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_unique_and_converse_cascade() {
        let mut relations = table(&[("locatedIn", 2), ("locusOf", 2)]);
        let invariants = vec![
            Invariant::unique("locatedIn"),
            Invariant::converse("locatedIn", "locusOf"),
        ];

        ResolutionCycle::new(&mut relations, &invariants)
            .run(TriggerBatch::relating("locatedIn", AtomTuple::from(["p", "roomA"])))
            .unwrap();
        ResolutionCycle::new(&mut relations, &invariants)
            .run(TriggerBatch::relating("locatedIn", AtomTuple::from(["p", "roomB"])))
            .unwrap();

        assert!(check(&relations, "locatedIn", &["p", "roomB"]));
        assert!(!check(&relations, "locatedIn", &["p", "roomA"]));
        assert!(check(&relations, "locusOf", &["roomB", "p"]));
        assert!(!check(&relations, "locusOf", &["roomA", "p"]));
    }

    #[test]
    fn test_contradiction_in_one_batch() {
        let mut relations = table(&[("r", 2)]);
        let batch = TriggerBatch {
            relate: vec![Trigger::new("r", ["a", "b"])],
            unrelate: vec![Trigger::new("r", ["a", "b"])],
        };
        let err = ResolutionCycle::new(&mut relations, &[]).run(batch).unwrap_err();
        assert!(matches!(err, ModelError::Contradiction { ref relation, .. } if relation == "r"));
    }

    #[test]
    fn test_contradiction_from_invariants() {
        // Implies wants isClosed, Mutex wants it retracted.
        let mut relations = table(&[("isLocked", 1), ("isClosed", 1), ("isOpen", 1)]);
        let invariants = vec![
            Invariant::implies("isLocked", "isClosed"),
            Invariant::implies("isLocked", "isOpen"),
            Invariant::mutex("isOpen", "isClosed"),
        ];
        let result = ResolutionCycle::new(&mut relations, &invariants)
            .run(TriggerBatch::relating("isLocked", AtomTuple::from("door")));
        assert!(matches!(result, Err(ModelError::Contradiction { .. })));
    }

    #[test]
    fn test_symmetric_terminates() {
        let mut relations = table(&[("adjacentTo", 2)]);
        let invariants = vec![Invariant::symmetric("adjacentTo")];
        let changed = ResolutionCycle::new(&mut relations, &invariants)
            .run(TriggerBatch::relating("adjacentTo", AtomTuple::from(["a", "b"])))
            .unwrap();
        assert_eq!(changed, 2);
        assert!(check(&relations, "adjacentTo", &["b", "a"]));
    }

    #[test]
    fn test_inverse_relates_complement() {
        let mut relations = table(&[("isOpen", 1), ("isClosed", 1)]);
        let invariants = vec![Invariant::inverse("isOpen", "isClosed")];
        ResolutionCycle::new(&mut relations, &invariants)
            .run(TriggerBatch::relating("isOpen", AtomTuple::from("door")))
            .unwrap();
        ResolutionCycle::new(&mut relations, &invariants)
            .run(TriggerBatch::unrelating("isOpen", AtomTuple::from("door")))
            .unwrap();
        assert!(check(&relations, "isClosed", &["door"]));
        assert!(!check(&relations, "isOpen", &["door"]));
    }

    #[test]
    fn test_supervenience_moves_possessions() {
        let mut relations = table(&[("locatedIn", 2), ("possesses", 2)]);
        let invariants = vec![
            Invariant::unique("locatedIn"),
            Invariant::supervenient("locatedIn", "possesses"),
        ];
        let batch = TriggerBatch {
            relate: vec![
                Trigger::new("locatedIn", ["p", "hall"]),
                Trigger::new("possesses", ["p", "key"]),
            ],
            unrelate: Vec::new(),
        };
        ResolutionCycle::new(&mut relations, &invariants).run(batch).unwrap();
        assert!(check(&relations, "locatedIn", &["key", "hall"]));

        ResolutionCycle::new(&mut relations, &invariants)
            .run(TriggerBatch::relating("locatedIn", AtomTuple::from(["p", "attic"])))
            .unwrap();
        assert!(check(&relations, "locatedIn", &["key", "attic"]));
        assert!(!check(&relations, "locatedIn", &["key", "hall"]));
    }

    #[test]
    fn test_noop_trigger_still_runs_hooks() {
        let mut relations = table(&[("isLocked", 1), ("isClosed", 1)]);
        relations
            .get_mut("isLocked")
            .unwrap()
            .relate(&AtomTuple::from("chest"))
            .unwrap();
        let invariants = vec![Invariant::implies("isLocked", "isClosed")];
        ResolutionCycle::new(&mut relations, &invariants)
            .run(TriggerBatch::relating("isLocked", AtomTuple::from("chest")))
            .unwrap();
        assert!(check(&relations, "isClosed", &["chest"]));
    }

    #[test]
    fn test_unknown_relation() {
        let mut relations = table(&[("r", 1)]);
        let err = ResolutionCycle::new(&mut relations, &[])
            .run(TriggerBatch::relating("missing", AtomTuple::from("a")))
            .unwrap_err();
        assert!(matches!(err, ModelError::UnknownRelation(name) if name == "missing"));
    }
}

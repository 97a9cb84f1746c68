//! Invariants - consistency rules maintained automatically between relations.
//!
//! Each invariant observes relate/unrelate events through four hooks and
//! answers with further events needed to keep its property true. The
//! [`ResolutionCycle`](crate::resolution::ResolutionCycle) drives them to a
//! fixpoint.

use serde::{Deserialize, Serialize};

use crate::atoms::AtomTuple;
use crate::collections::SemanticKey;
use crate::error::{ModelError, Result};
use crate::relation::{Relation, RelationTable};

/// A relate or unrelate request against one fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub relation: String,
    pub tuple: AtomTuple,
}

impl Trigger {
    /// Create a trigger.
    pub fn new(relation: impl Into<String>, tuple: impl Into<AtomTuple>) -> Self {
        Self {
            relation: relation.into(),
            tuple: tuple.into(),
        }
    }
}

impl SemanticKey for Trigger {
    fn write_key(&self, out: &mut String) {
        (self.relation.as_str(), &self.tuple).write_key(out);
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.relation, self.tuple)
    }
}

/// Relate and unrelate triggers, applied relates first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerBatch {
    pub relate: Vec<Trigger>,
    pub unrelate: Vec<Trigger>,
}

impl TriggerBatch {
    /// An empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// A batch holding a single relate.
    pub fn relating(relation: &str, tuple: AtomTuple) -> Self {
        Self {
            relate: vec![Trigger::new(relation, tuple)],
            unrelate: Vec::new(),
        }
    }

    /// A batch holding a single unrelate.
    pub fn unrelating(relation: &str, tuple: AtomTuple) -> Self {
        Self {
            relate: Vec::new(),
            unrelate: vec![Trigger::new(relation, tuple)],
        }
    }

    /// Whether the batch asks for nothing.
    pub fn is_empty(&self) -> bool {
        self.relate.is_empty() && self.unrelate.is_empty()
    }

    /// Total number of triggers.
    pub fn len(&self) -> usize {
        self.relate.len() + self.unrelate.len()
    }
}

/// Invariant kinds, as named in declaration schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvariantKind {
    Unique,
    Symmetric,
    Converse,
    Mutex,
    Inverse,
    Implies,
    Supervenient,
}

impl InvariantKind {
    /// Lowercase name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvariantKind::Unique => "unique",
            InvariantKind::Symmetric => "symmetric",
            InvariantKind::Converse => "converse",
            InvariantKind::Mutex => "mutex",
            InvariantKind::Inverse => "inverse",
            InvariantKind::Implies => "implies",
            InvariantKind::Supervenient => "supervenient",
        }
    }

    /// Number of relations the kind is declared over.
    pub fn relation_count(&self) -> usize {
        match self {
            InvariantKind::Unique | InvariantKind::Symmetric => 1,
            _ => 2,
        }
    }
}

impl std::fmt::Display for InvariantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A consistency rule over one or two relations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invariant {
    /// At most one object tuple per subject.
    Unique { relation: String },

    /// `R(a, b)` iff `R(b, a)`.
    Symmetric { relation: String },

    /// `R(a, ..., b)` iff `R'(b, ..., a)`.
    Converse { lhs: String, rhs: String },

    /// Never both `R(t)` and `R'(t)`.
    Mutex { lhs: String, rhs: String },

    /// Exactly one of `R(t)` and `R'(t)`.
    Inverse { lhs: String, rhs: String },

    /// `R(t)` follows `R'(t)` on relate and unrelate.
    Implies {
        antecedent: String,
        consequent: String,
    },

    /// Possessed things are located wherever their holder is.
    Supervenient {
        located_in: String,
        possesses: String,
    },
}

impl Invariant {
    pub fn unique(relation: impl Into<String>) -> Self {
        Invariant::Unique {
            relation: relation.into(),
        }
    }

    pub fn symmetric(relation: impl Into<String>) -> Self {
        Invariant::Symmetric {
            relation: relation.into(),
        }
    }

    pub fn converse(lhs: impl Into<String>, rhs: impl Into<String>) -> Self {
        Invariant::Converse {
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    pub fn mutex(lhs: impl Into<String>, rhs: impl Into<String>) -> Self {
        Invariant::Mutex {
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    pub fn inverse(lhs: impl Into<String>, rhs: impl Into<String>) -> Self {
        Invariant::Inverse {
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    pub fn implies(antecedent: impl Into<String>, consequent: impl Into<String>) -> Self {
        Invariant::Implies {
            antecedent: antecedent.into(),
            consequent: consequent.into(),
        }
    }

    pub fn supervenient(located_in: impl Into<String>, possesses: impl Into<String>) -> Self {
        Invariant::Supervenient {
            located_in: located_in.into(),
            possesses: possesses.into(),
        }
    }

    /// Build an invariant from a kind and its relation names, as in a schema.
    pub fn from_kind(kind: InvariantKind, relations: &[String]) -> Result<Self> {
        let invalid = || ModelError::InvalidInvariant {
            kind: kind.as_str(),
            reason: format!(
                "expected {} relation(s), got {}",
                kind.relation_count(),
                relations.len()
            ),
        };
        match (kind, relations) {
            (InvariantKind::Unique, [r]) => Ok(Self::unique(r)),
            (InvariantKind::Symmetric, [r]) => Ok(Self::symmetric(r)),
            (InvariantKind::Converse, [a, b]) => Ok(Self::converse(a, b)),
            (InvariantKind::Mutex, [a, b]) => Ok(Self::mutex(a, b)),
            (InvariantKind::Inverse, [a, b]) => Ok(Self::inverse(a, b)),
            (InvariantKind::Implies, [a, b]) => Ok(Self::implies(a, b)),
            (InvariantKind::Supervenient, [a, b]) => Ok(Self::supervenient(a, b)),
            _ => Err(invalid()),
        }
    }

    /// The invariant's kind.
    pub fn kind(&self) -> InvariantKind {
        match self {
            Invariant::Unique { .. } => InvariantKind::Unique,
            Invariant::Symmetric { .. } => InvariantKind::Symmetric,
            Invariant::Converse { .. } => InvariantKind::Converse,
            Invariant::Mutex { .. } => InvariantKind::Mutex,
            Invariant::Inverse { .. } => InvariantKind::Inverse,
            Invariant::Implies { .. } => InvariantKind::Implies,
            Invariant::Supervenient { .. } => InvariantKind::Supervenient,
        }
    }

    /// Names of the relations this invariant is declared over.
    pub fn relations(&self) -> Vec<&str> {
        match self {
            Invariant::Unique { relation } | Invariant::Symmetric { relation } => {
                vec![relation.as_str()]
            }
            Invariant::Converse { lhs, rhs }
            | Invariant::Mutex { lhs, rhs }
            | Invariant::Inverse { lhs, rhs } => vec![lhs.as_str(), rhs.as_str()],
            Invariant::Implies {
                antecedent,
                consequent,
            } => vec![antecedent.as_str(), consequent.as_str()],
            Invariant::Supervenient {
                located_in,
                possesses,
            } => vec![located_in.as_str(), possesses.as_str()],
        }
    }

    /// Check the invariant can be maintained over the declared relations.
    pub fn validate(&self, relations: &RelationTable) -> Result<()> {
        let kind = self.kind().as_str();
        let mut arities = Vec::new();
        for name in self.relations() {
            let relation = relations
                .get(name)
                .ok_or_else(|| ModelError::UnknownRelation(name.to_string()))?;
            arities.push(relation.arity());
        }
        let reject = |reason: String| Err(ModelError::InvalidInvariant { kind, reason });

        match (self, arities.as_slice()) {
            (Invariant::Unique { relation }, [arity]) if *arity < 2 => {
                reject(format!("`{relation}` must have arity of at least 2"))
            }
            (Invariant::Symmetric { relation }, [arity]) if *arity != 2 => {
                reject(format!("`{relation}` must have arity 2"))
            }
            (Invariant::Supervenient { .. }, [a, b]) if *a != 2 || *b != 2 => {
                reject("both relations must have arity 2".to_string())
            }
            (_, [a, b]) if a != b => reject(format!("arities differ ({a} vs {b})")),
            _ => Ok(()),
        }
    }

    /// Events to run before `relation(tuple)` is made true.
    pub fn before_relate(
        &self,
        relations: &RelationTable,
        relation: &str,
        tuple: &AtomTuple,
    ) -> Result<TriggerBatch> {
        let mut out = TriggerBatch::new();
        if let Invariant::Unique { relation: unique } = self {
            if unique == relation {
                let Some(subject) = tuple.subject() else {
                    return Ok(out);
                };
                let wanted = tuple.rest();
                let existing = related(relations, unique, subject)?;
                for objects in existing.iter()? {
                    if *objects != wanted {
                        out.unrelate
                            .push(Trigger::new(unique.as_str(), objects.prepend(subject)));
                    }
                }
            }
        }
        Ok(out)
    }

    /// Events to run after `relation(tuple)` was made true.
    pub fn after_relate(
        &self,
        relations: &RelationTable,
        relation: &str,
        tuple: &AtomTuple,
    ) -> Result<TriggerBatch> {
        let mut out = TriggerBatch::new();
        match self {
            Invariant::Symmetric { relation: r } if r == relation => {
                out.relate.push(Trigger::new(r.as_str(), tuple.reversed()));
            }
            Invariant::Converse { lhs, rhs } => {
                if lhs == relation {
                    out.relate.push(Trigger::new(rhs.as_str(), tuple.reversed()));
                }
                if rhs == relation {
                    out.relate.push(Trigger::new(lhs.as_str(), tuple.reversed()));
                }
            }
            Invariant::Mutex { lhs, rhs } | Invariant::Inverse { lhs, rhs } => {
                if lhs == relation {
                    out.unrelate.push(Trigger::new(rhs.as_str(), tuple.clone()));
                }
                if rhs == relation {
                    out.unrelate.push(Trigger::new(lhs.as_str(), tuple.clone()));
                }
            }
            Invariant::Implies {
                antecedent,
                consequent,
            } if antecedent == relation => {
                out.relate.push(Trigger::new(consequent.as_str(), tuple.clone()));
            }
            Invariant::Supervenient {
                located_in,
                possesses,
            } => {
                let (Some(holder), objects) = (tuple.subject(), tuple.rest()) else {
                    return Ok(out);
                };
                if located_in == relation {
                    // Everything the holder possesses moves to the new place.
                    for item in related(relations, possesses, holder)?.iter()? {
                        out.relate.push(Trigger::new(
                            located_in.as_str(),
                            AtomTuple::flatten([item, &objects]),
                        ));
                    }
                }
                if possesses == relation {
                    for place in related(relations, located_in, holder)?.iter()? {
                        out.relate.push(Trigger::new(
                            located_in.as_str(),
                            AtomTuple::flatten([&objects, place]),
                        ));
                    }
                }
            }
            _ => {}
        }
        Ok(out)
    }

    /// Events to run before `relation(tuple)` is made false.
    pub fn before_unrelate(
        &self,
        _relations: &RelationTable,
        _relation: &str,
        _tuple: &AtomTuple,
    ) -> Result<TriggerBatch> {
        Ok(TriggerBatch::new())
    }

    /// Events to run after `relation(tuple)` was made false.
    pub fn after_unrelate(
        &self,
        _relations: &RelationTable,
        relation: &str,
        tuple: &AtomTuple,
    ) -> Result<TriggerBatch> {
        let mut out = TriggerBatch::new();
        match self {
            Invariant::Symmetric { relation: r } if r == relation => {
                out.unrelate.push(Trigger::new(r.as_str(), tuple.reversed()));
            }
            Invariant::Converse { lhs, rhs } => {
                if lhs == relation {
                    out.unrelate.push(Trigger::new(rhs.as_str(), tuple.reversed()));
                }
                if rhs == relation {
                    out.unrelate.push(Trigger::new(lhs.as_str(), tuple.reversed()));
                }
            }
            Invariant::Inverse { lhs, rhs } => {
                if lhs == relation {
                    out.relate.push(Trigger::new(rhs.as_str(), tuple.clone()));
                }
                if rhs == relation {
                    out.relate.push(Trigger::new(lhs.as_str(), tuple.clone()));
                }
            }
            Invariant::Implies {
                antecedent,
                consequent,
            } if antecedent == relation => {
                out.unrelate.push(Trigger::new(consequent.as_str(), tuple.clone()));
            }
            _ => {}
        }
        Ok(out)
    }
}

fn related(
    relations: &RelationTable,
    name: &str,
    subject: &crate::atoms::Atom,
) -> Result<crate::collections::SemanticSet<AtomTuple>> {
    relations
        .get(name)
        .map(|relation: &Relation| relation.related_objects_for_subject(subject))
        .ok_or_else(|| ModelError::UnknownRelation(name.to_string()))
}

//! Query evaluation.

use super::{DerivedRelation, Model};
use crate::atoms::{Atom, AtomTuple};
use crate::collections::SemanticSet;
use crate::error::{ModelError, Result};
use crate::query::{QueryArg, QueryExpr, QueryValue};

/// Operands of `and`/`or`, all of one kind.
enum Operands {
    Bools(Vec<bool>),
    Sets(Vec<SemanticSet<AtomTuple>>),
}

impl Model {
    pub(super) fn evaluate(&self, expr: &QueryExpr) -> Result<QueryValue> {
        match expr {
            QueryExpr::And(clauses) => match self.operands("and", clauses)? {
                Operands::Bools(values) => Ok(QueryValue::Bool(values.into_iter().all(|v| v))),
                Operands::Sets(sets) => {
                    let mut sets = sets.into_iter();
                    let first = sets.next().unwrap_or_default();
                    Ok(QueryValue::Set(
                        sets.fold(first, |acc, set| acc.intersection(&set)),
                    ))
                }
            },
            QueryExpr::Or(clauses) if clauses.is_empty() => Ok(QueryValue::Set(SemanticSet::new())),
            QueryExpr::Or(clauses) => match self.operands("or", clauses)? {
                Operands::Bools(values) => Ok(QueryValue::Bool(values.into_iter().any(|v| v))),
                Operands::Sets(sets) => Ok(QueryValue::Set(
                    sets.iter()
                        .fold(SemanticSet::new(), |acc, set| acc.union(set)),
                )),
            },
            QueryExpr::Not(inner) => match self.query(inner)? {
                QueryValue::Bool(value) => Ok(QueryValue::Bool(!value)),
                QueryValue::Null => Ok(QueryValue::Bool(true)),
                QueryValue::Set(set) => Ok(QueryValue::Set(set.invert())),
                QueryValue::Tuple(_) => Err(ModelError::QueryTypeMismatch {
                    clause: "not",
                    reason: "cannot negate a tuple".to_string(),
                }),
            },
            QueryExpr::Which(relation, subject) => {
                Ok(QueryValue::Set(self.eval_which(relation, subject)?))
            }
            QueryExpr::FirstWhich(relation, subject) => {
                let objects = self.eval_which(relation, subject)?;
                Ok(objects.first()?.cloned().into())
            }
            QueryExpr::AnyWhich(relation, subjects) => {
                let clauses = self.each_which(relation, subjects)?;
                self.query(&QueryExpr::Or(clauses))
            }
            QueryExpr::AllWhich(relation, subjects) => {
                let clauses = self.each_which(relation, subjects)?;
                self.query(&QueryExpr::And(clauses))
            }
            QueryExpr::Check(relation, tuple) => {
                Ok(QueryValue::Bool(self.eval_check(relation, tuple)?))
            }
            QueryExpr::Subjects(relation) => Ok(QueryValue::Set(self.eval_subjects(relation)?)),
            QueryExpr::Propositions(relation) => {
                Ok(QueryValue::Set(self.eval_propositions(relation)?))
            }
            QueryExpr::Parent(inner) => match &self.parent {
                Some(parent) => parent.query(inner),
                None => Ok(QueryValue::Null),
            },
            QueryExpr::Bool(inner) => Ok(QueryValue::Bool(self.query(inner)?.truthy())),
        }
    }

    /// Evaluate clauses and check they agree on booleans or sets.
    ///
    /// Tuples count as singleton sets. Null is false among booleans and empty
    /// among sets.
    fn operands(&self, clause: &'static str, clauses: &[QueryExpr]) -> Result<Operands> {
        let values = clauses
            .iter()
            .map(|expr| self.query(expr))
            .collect::<Result<Vec<_>>>()?;

        let has_bool = values.iter().any(|v| matches!(v, QueryValue::Bool(_)));
        let has_set = values
            .iter()
            .any(|v| matches!(v, QueryValue::Set(_) | QueryValue::Tuple(_)));

        match (has_bool, has_set) {
            (true, true) => Err(ModelError::QueryTypeMismatch {
                clause,
                reason: "cannot combine boolean and set-valued clauses".to_string(),
            }),
            (_, false) => Ok(Operands::Bools(values.iter().map(QueryValue::truthy).collect())),
            (false, true) => Ok(Operands::Sets(
                values
                    .into_iter()
                    .map(|v| v.into_set(clause))
                    .collect::<Result<_>>()?,
            )),
        }
    }

    /// Resolve an argument into one flat tuple.
    ///
    /// `None` when a nested query produced nothing to put in the tuple.
    pub(super) fn resolve_tuple(&self, clause: &'static str, arg: &QueryArg) -> Result<Option<AtomTuple>> {
        match arg {
            QueryArg::Atom(atom) => Ok(Some(AtomTuple::from(atom))),
            QueryArg::List(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    match self.resolve_tuple(clause, item)? {
                        Some(part) => parts.push(part),
                        None => return Ok(None),
                    }
                }
                Ok(Some(AtomTuple::flatten(parts)))
            }
            QueryArg::Query(expr) => match self.query(expr)? {
                QueryValue::Tuple(tuple) => Ok(Some(tuple)),
                QueryValue::Null => Ok(None),
                QueryValue::Set(set) => match set.len()? {
                    0 => Ok(None),
                    1 => Ok(set.first()?.cloned()),
                    n => Err(ModelError::QueryTypeMismatch {
                        clause,
                        reason: format!("expected a single tuple, got a set of {n}"),
                    }),
                },
                QueryValue::Bool(_) => Err(ModelError::QueryTypeMismatch {
                    clause,
                    reason: "expected a tuple, got a boolean".to_string(),
                }),
            },
        }
    }

    /// Resolve an argument into a list of atoms; sets contribute all their members.
    fn resolve_atoms(&self, clause: &'static str, arg: &QueryArg) -> Result<Vec<Atom>> {
        match arg {
            QueryArg::Atom(atom) => Ok(vec![atom.clone()]),
            QueryArg::List(items) => {
                let mut atoms = Vec::new();
                for item in items {
                    atoms.extend(self.resolve_atoms(clause, item)?);
                }
                Ok(atoms)
            }
            QueryArg::Query(expr) => match self.query(expr)? {
                QueryValue::Tuple(tuple) => Ok(tuple.iter().cloned().collect()),
                QueryValue::Null => Ok(Vec::new()),
                QueryValue::Set(set) => Ok(set
                    .iter()?
                    .flat_map(|tuple| tuple.iter().cloned())
                    .collect()),
                QueryValue::Bool(_) => Err(ModelError::QueryTypeMismatch {
                    clause,
                    reason: "expected subjects, got a boolean".to_string(),
                }),
            },
        }
    }

    fn each_which(&self, relation: &str, subjects: &QueryArg) -> Result<Vec<QueryExpr>> {
        Ok(self
            .resolve_atoms("anyWhich", subjects)?
            .into_iter()
            .map(|subject| QueryExpr::which(relation, subject))
            .collect())
    }

    fn eval_which(&self, relation: &str, subject: &QueryArg) -> Result<SemanticSet<AtomTuple>> {
        let arity = self.arity(relation)?;
        if arity < 2 {
            return Err(ModelError::UnsupportedQuery {
                clause: "which",
                relation: relation.to_string(),
                reason: format!("relation has arity {arity}"),
            });
        }
        let subject = match subject {
            QueryArg::Atom(atom) => atom.clone(),
            other => {
                let mut atoms = self.resolve_atoms("which", other)?;
                match atoms.len() {
                    0 => return Ok(SemanticSet::new()),
                    1 => atoms.remove(0),
                    count => {
                        return Err(ModelError::AmbiguousSubject {
                            relation: relation.to_string(),
                            count,
                        })
                    }
                }
            }
        };
        self.objects_of(relation, &subject)
    }

    /// Object tuples of `subject` in a relation of arity two or more.
    fn objects_of(&self, relation: &str, subject: &Atom) -> Result<SemanticSet<AtomTuple>> {
        if let Some(table) = self.relations.get(relation) {
            return Ok(table.related_objects_for_subject(subject));
        }
        let derived = self.derived(relation)?;
        self.query(&derived.query_for(subject))?.into_set("which")
    }

    fn derived(&self, relation: &str) -> Result<&DerivedRelation> {
        self.declarations
            .derived
            .get(relation)
            .ok_or_else(|| ModelError::UnknownRelation(relation.to_string()))
    }

    fn eval_check(&self, relation: &str, arg: &QueryArg) -> Result<bool> {
        let arity = self.arity(relation)?;
        let Some(tuple) = self.resolve_tuple("check", arg)? else {
            return Ok(false);
        };
        self.ensure_known(&tuple)?;
        if let Some(table) = self.relations.get(relation) {
            return table.check(&tuple);
        }
        let derived = self.derived(relation)?;
        let subject = match tuple.subject() {
            Some(subject) if tuple.len() == arity => subject,
            _ => {
                return Err(ModelError::ArityMismatch {
                    relation: relation.to_string(),
                    expected: arity,
                    found: tuple.len(),
                })
            }
        };
        if arity == 1 {
            Ok(self.query(&derived.query_for(subject))?.truthy())
        } else {
            Ok(self.objects_of(relation, subject)?.contains(&tuple.rest()))
        }
    }

    /// Whether a derived relation holds anything for `subject`.
    fn derived_holds(&self, derived: &DerivedRelation, subject: &Atom) -> Result<bool> {
        Ok(self.query(&derived.query_for(subject))?.truthy())
    }

    fn eval_subjects(&self, relation: &str) -> Result<SemanticSet<AtomTuple>> {
        if let Some(table) = self.relations.get(relation) {
            return Ok(table.subjects());
        }
        // No table to scan: every atom of the universe is tested.
        let derived = self.derived(relation)?;
        let mut subjects = SemanticSet::new();
        for atom in self.atoms().iter()? {
            if self.derived_holds(derived, atom)? {
                subjects.insert(AtomTuple::from(atom));
            }
        }
        Ok(subjects)
    }

    fn eval_propositions(&self, relation: &str) -> Result<SemanticSet<AtomTuple>> {
        if let Some(table) = self.relations.get(relation) {
            return Ok(table.propositions());
        }
        let derived = self.derived(relation)?;
        let name = Atom::new(relation);
        let mut propositions = SemanticSet::new();
        for atom in self.atoms().iter()? {
            if derived.arity() == 1 {
                if self.derived_holds(derived, atom)? {
                    propositions.insert(AtomTuple::new([name.clone(), atom.clone()]));
                }
                continue;
            }
            for objects in self.objects_of(relation, atom)?.iter()? {
                if !objects.is_empty() {
                    propositions.insert(AtomTuple::flatten([
                        AtomTuple::from(&name),
                        AtomTuple::from(atom),
                        objects.clone(),
                    ]));
                }
            }
        }
        Ok(propositions)
    }
}

#[cfg(test)]
mod tests {
    use crate::atoms::AtomTuple;
    use crate::collections::SemanticSet;
    use crate::error::ModelError;
    use crate::invariants::Invariant;
    use crate::model::Model;
    use crate::query::{EventBatch, QueryArg, QueryExpr, QueryValue};

    fn kitchen() -> Model {
        Model::builder()
            .atoms(["p", "q", "kitchen", "hall", "bowl", "knife", "table"])
            .relation("locatedIn", 2)
            .relation("locusOf", 2)
            .relation("possesses", 2)
            .relation("isPortable", 1)
            .invariant(Invariant::unique("locatedIn"))
            .invariant(Invariant::converse("locatedIn", "locusOf"))
            .derived("isNear", 2, |subject| {
                QueryExpr::any_which("locusOf", QueryExpr::which("locatedIn", subject))
            })
            .derived("isHolding", 1, |subject| {
                QueryExpr::bool(QueryExpr::which("possesses", subject))
            })
            .initial_facts(
                EventBatch::new()
                    .relate("locatedIn", ["p", "kitchen"])
                    .relate("locatedIn", ["q", "hall"])
                    .relate("locatedIn", ["bowl", "kitchen"])
                    .relate("locatedIn", ["knife", "kitchen"])
                    .relate("locatedIn", ["table", "kitchen"])
                    .relate("isPortable", "bowl")
                    .relate("isPortable", "knife")
                    .relate("possesses", ["q", "knife"]),
            )
            .build()
            .unwrap()
    }

    fn set(items: &[&str]) -> SemanticSet<AtomTuple> {
        items.iter().map(|item| AtomTuple::from(*item)).collect()
    }

    #[test]
    fn test_empty_and_or() {
        let model = kitchen();
        assert!(matches!(
            model.query(&QueryExpr::and([])).unwrap(),
            QueryValue::Bool(true)
        ));
        let or = model.query(&QueryExpr::or([])).unwrap();
        assert!(or.as_set().unwrap().is_empty().unwrap());
    }

    #[test]
    fn test_and_or_over_sets() {
        let model = kitchen();
        let portable_here = model
            .query(&QueryExpr::and([
                QueryExpr::which("locusOf", "kitchen"),
                QueryExpr::subjects("isPortable"),
            ]))
            .unwrap();
        assert!(portable_here.as_set().unwrap().identical(&set(&["bowl", "knife"])));

        let anywhere = model
            .query(&QueryExpr::or([
                QueryExpr::which("locusOf", "hall"),
                QueryExpr::first_which("locatedIn", "bowl"),
            ]))
            .unwrap();
        assert!(anywhere.as_set().unwrap().identical(&set(&["q", "kitchen"])));
    }

    #[test]
    fn test_mixed_operands_rejected() {
        let model = kitchen();
        let err = model
            .query(&QueryExpr::and([
                QueryExpr::check("isPortable", "bowl"),
                QueryExpr::subjects("isPortable"),
            ]))
            .unwrap_err();
        assert!(matches!(err, ModelError::QueryTypeMismatch { clause: "and", .. }));
    }

    #[test]
    fn test_not_complement() {
        let model = kitchen();
        let fixed_here = model
            .query(&QueryExpr::and([
                QueryExpr::which("locusOf", "kitchen"),
                QueryExpr::not(QueryExpr::subjects("isPortable")),
            ]))
            .unwrap();
        assert!(fixed_here.as_set().unwrap().identical(&set(&["p", "table"])));

        let double = model
            .query(&QueryExpr::not(QueryExpr::not(QueryExpr::subjects("isPortable"))))
            .unwrap();
        assert!(double.as_set().unwrap().identical(&set(&["bowl", "knife"])));

        assert!(matches!(
            model.query(&QueryExpr::not(QueryExpr::check("isPortable", "table"))).unwrap(),
            QueryValue::Bool(true)
        ));
    }

    #[test]
    fn test_which_subject_query() {
        let model = kitchen();
        let where_bowl_is = model
            .which("locusOf", QueryExpr::first_which("locatedIn", "bowl"))
            .unwrap();
        assert!(where_bowl_is.contains(&AtomTuple::from("knife")));

        let err = model
            .which("locatedIn", QueryExpr::which("locusOf", "kitchen"))
            .unwrap_err();
        assert!(matches!(err, ModelError::AmbiguousSubject { count: 4, .. }));

        let none = model
            .which("locatedIn", QueryExpr::which("possesses", "p"))
            .unwrap();
        assert!(none.is_empty().unwrap());
    }

    #[test]
    fn test_which_unary_unsupported() {
        let model = kitchen();
        assert!(matches!(
            model.which("isPortable", "bowl"),
            Err(ModelError::UnsupportedQuery { clause: "which", .. })
        ));
        assert!(matches!(
            model.which("isHolding", "q"),
            Err(ModelError::UnsupportedQuery { .. })
        ));
    }

    #[test]
    fn test_first_which() {
        let model = kitchen();
        assert_eq!(
            model.first_which("locatedIn", "q").unwrap(),
            Some(AtomTuple::from("hall"))
        );
        assert_eq!(model.first_which("possesses", "p").unwrap(), None);
    }

    #[test]
    fn test_any_and_all_which() {
        let model = kitchen();
        let rooms = model
            .query(&QueryExpr::any_which("locatedIn", QueryArg::from(["p", "q"])))
            .unwrap();
        assert!(rooms.as_set().unwrap().identical(&set(&["kitchen", "hall"])));

        let shared = model
            .query(&QueryExpr::all_which("locatedIn", QueryArg::from(["p", "bowl"])))
            .unwrap();
        assert!(shared.as_set().unwrap().identical(&set(&["kitchen"])));
    }

    #[test]
    fn test_which_over_no_subjects() {
        let model = kitchen();
        let nobody = QueryArg::from(QueryExpr::which("possesses", "p"));

        let any = model.query(&QueryExpr::any_which("locatedIn", nobody.clone())).unwrap();
        assert!(any.as_set().unwrap().is_empty().unwrap());

        let all = QueryExpr::all_which("locatedIn", nobody);
        assert!(matches!(model.query(&all).unwrap(), QueryValue::Bool(true)));
        assert!(matches!(
            model.query(&QueryExpr::and(vec![all, QueryExpr::which("locatedIn", "p")])),
            Err(ModelError::QueryTypeMismatch { clause: "and", .. })
        ));
    }

    #[test]
    fn test_derived_which_and_check() {
        let model = kitchen();
        let near_p = model.which("isNear", "p").unwrap();
        assert!(near_p.contains(&AtomTuple::from("bowl")));
        assert!(!near_p.contains(&AtomTuple::from("q")));

        assert!(model.check("isNear", ["p", "knife"]).unwrap());
        assert!(!model.check("isNear", ["p", "q"]).unwrap());
        assert!(model.check("isHolding", "q").unwrap());
        assert!(!model.check("isHolding", "p").unwrap());
    }

    #[test]
    fn test_derived_subjects_and_propositions() {
        let model = kitchen();
        let holders = model.subjects("isHolding").unwrap();
        assert!(holders.identical(&set(&["q"])));

        let props = model.propositions("isHolding").unwrap();
        assert!(props.contains(&AtomTuple::from(["isHolding", "q"])));

        let near = model.propositions("isNear").unwrap();
        assert!(near.contains(&AtomTuple::from(["isNear", "bowl", "table"])));
        assert!(near.contains(&AtomTuple::from(["isNear", "q", "q"])));
    }

    #[test]
    fn test_check_errors() {
        let model = kitchen();
        assert!(matches!(
            model.check("locatedIn", ["p", "attic"]),
            Err(ModelError::UnknownAtom(atom)) if atom == "attic"
        ));
        assert!(matches!(
            model.check("isNear", ["p"]),
            Err(ModelError::ArityMismatch { .. })
        ));
        assert!(matches!(
            model.check("missing", "p"),
            Err(ModelError::UnknownRelation(_))
        ));
        // A nested query that yields nothing makes the fact false.
        assert!(!model
            .check(
                "locatedIn",
                vec![
                    QueryArg::from(QueryExpr::first_which("possesses", "p")),
                    QueryArg::from("kitchen"),
                ],
            )
            .unwrap());
    }

    #[test]
    fn test_parent_and_bool() {
        let mut model = kitchen();
        assert!(model
            .query(&QueryExpr::parent(QueryExpr::subjects("isPortable")))
            .unwrap()
            .is_null());

        let frozen = {
            model
                .assert(&EventBatch::new().relate("possesses", ["p", "bowl"]))
                .unwrap();
            model.freeze()
        };
        let mut child = frozen.child();
        child
            .assert(&EventBatch::new().unrelate("possesses", ["p", "bowl"]))
            .unwrap();
        let held_before = child
            .query(&QueryExpr::parent(QueryExpr::bool(QueryExpr::which("possesses", "p"))))
            .unwrap();
        assert_eq!(held_before.as_bool(), Some(true));
        assert_eq!(
            child
                .query(&QueryExpr::bool(QueryExpr::which("possesses", "p")))
                .unwrap()
                .as_bool(),
            Some(false)
        );
    }
}

//! Query algebra - expressions, arguments and mutation batches.
//!
//! Expressions serialize to the JSON shape used by declaration files, with
//! exactly one key per object:
//!
//! ```json
//! {"and": [{"which": ["locatedIn", "p"]}, {"not": {"subjects": "isLocked"}}]}
//! {"relate": [["locatedIn", ["p", "roomA"]]], "unrelate": []}
//! ```

mod value;

pub use value::*;

use serde::{Deserialize, Serialize};

use crate::atoms::{Atom, AtomTuple};
use crate::error::Result;

/// A node of the query grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryExpr {
    /// Conjunction: logical AND over booleans, intersection over sets.
    And(Vec<QueryExpr>),
    /// Disjunction: logical OR over booleans, union over sets.
    Or(Vec<QueryExpr>),
    /// Negation, or the complement view of a set.
    Not(Box<QueryExpr>),
    /// Object tuples related to one subject.
    Which(String, QueryArg),
    /// The first object tuple related to one subject, or null.
    FirstWhich(String, QueryArg),
    /// Union of `which` over several subjects.
    ///
    /// With no subjects this is `or([])`, the empty set.
    AnyWhich(String, QueryArg),
    /// Intersection of `which` over several subjects.
    ///
    /// With no subjects this is `and([])`, which is `true` rather than a set,
    /// so combining it with set-valued clauses in `and`/`or` is a type
    /// mismatch. Guard it with `bool` when the subjects may be empty.
    AllWhich(String, QueryArg),
    /// Truth of a single fact.
    Check(String, QueryArg),
    /// Every subject with at least one fact.
    Subjects(String),
    /// Every fact as a `(relation, subject, objects...)` tuple.
    Propositions(String),
    /// Evaluate against the parent model, or null without one.
    Parent(Box<QueryExpr>),
    /// Presence of any result.
    Bool(Box<QueryExpr>),
}

impl QueryExpr {
    pub fn and(clauses: impl IntoIterator<Item = QueryExpr>) -> Self {
        QueryExpr::And(clauses.into_iter().collect())
    }

    pub fn or(clauses: impl IntoIterator<Item = QueryExpr>) -> Self {
        QueryExpr::Or(clauses.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(clause: QueryExpr) -> Self {
        QueryExpr::Not(Box::new(clause))
    }

    pub fn which(relation: impl Into<String>, subject: impl Into<QueryArg>) -> Self {
        QueryExpr::Which(relation.into(), subject.into())
    }

    pub fn first_which(relation: impl Into<String>, subject: impl Into<QueryArg>) -> Self {
        QueryExpr::FirstWhich(relation.into(), subject.into())
    }

    pub fn any_which(relation: impl Into<String>, subjects: impl Into<QueryArg>) -> Self {
        QueryExpr::AnyWhich(relation.into(), subjects.into())
    }

    pub fn all_which(relation: impl Into<String>, subjects: impl Into<QueryArg>) -> Self {
        QueryExpr::AllWhich(relation.into(), subjects.into())
    }

    pub fn check(relation: impl Into<String>, tuple: impl Into<QueryArg>) -> Self {
        QueryExpr::Check(relation.into(), tuple.into())
    }

    pub fn subjects(relation: impl Into<String>) -> Self {
        QueryExpr::Subjects(relation.into())
    }

    pub fn propositions(relation: impl Into<String>) -> Self {
        QueryExpr::Propositions(relation.into())
    }

    pub fn parent(clause: QueryExpr) -> Self {
        QueryExpr::Parent(Box::new(clause))
    }

    pub fn bool(clause: QueryExpr) -> Self {
        QueryExpr::Bool(Box::new(clause))
    }

    /// Parse an expression from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The JSON form of the expression.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Replace every occurrence of the atom `placeholder` with `value`.
    ///
    /// Relation names are left alone; only atom arguments are rewritten.
    pub fn substitute(&self, placeholder: &Atom, value: &Atom) -> QueryExpr {
        let sub = |expr: &QueryExpr| expr.substitute(placeholder, value);
        let arg = |arg: &QueryArg| arg.substitute(placeholder, value);
        match self {
            QueryExpr::And(clauses) => QueryExpr::And(clauses.iter().map(sub).collect()),
            QueryExpr::Or(clauses) => QueryExpr::Or(clauses.iter().map(sub).collect()),
            QueryExpr::Not(inner) => QueryExpr::Not(Box::new(sub(inner.as_ref()))),
            QueryExpr::Which(r, a) => QueryExpr::Which(r.clone(), arg(a)),
            QueryExpr::FirstWhich(r, a) => QueryExpr::FirstWhich(r.clone(), arg(a)),
            QueryExpr::AnyWhich(r, a) => QueryExpr::AnyWhich(r.clone(), arg(a)),
            QueryExpr::AllWhich(r, a) => QueryExpr::AllWhich(r.clone(), arg(a)),
            QueryExpr::Check(r, a) => QueryExpr::Check(r.clone(), arg(a)),
            QueryExpr::Subjects(r) => QueryExpr::Subjects(r.clone()),
            QueryExpr::Propositions(r) => QueryExpr::Propositions(r.clone()),
            QueryExpr::Parent(inner) => QueryExpr::Parent(Box::new(sub(inner.as_ref()))),
            QueryExpr::Bool(inner) => QueryExpr::Bool(Box::new(sub(inner.as_ref()))),
        }
    }

    /// Name of the clause, as it appears in JSON.
    pub fn clause(&self) -> &'static str {
        match self {
            QueryExpr::And(_) => "and",
            QueryExpr::Or(_) => "or",
            QueryExpr::Not(_) => "not",
            QueryExpr::Which(..) => "which",
            QueryExpr::FirstWhich(..) => "firstWhich",
            QueryExpr::AnyWhich(..) => "anyWhich",
            QueryExpr::AllWhich(..) => "allWhich",
            QueryExpr::Check(..) => "check",
            QueryExpr::Subjects(_) => "subjects",
            QueryExpr::Propositions(_) => "propositions",
            QueryExpr::Parent(_) => "parent",
            QueryExpr::Bool(_) => "bool",
        }
    }
}

/// An argument position: a literal atom, a list that flattens, or a nested query.
///
/// The tag is fixed when the argument is built, so evaluation never has to
/// guess an argument's shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryArg {
    Atom(Atom),
    List(Vec<QueryArg>),
    Query(Box<QueryExpr>),
}

impl QueryArg {
    fn substitute(&self, placeholder: &Atom, value: &Atom) -> QueryArg {
        match self {
            QueryArg::Atom(atom) if atom == placeholder => QueryArg::Atom(value.clone()),
            QueryArg::Atom(atom) => QueryArg::Atom(atom.clone()),
            QueryArg::List(items) => QueryArg::List(
                items
                    .iter()
                    .map(|item| item.substitute(placeholder, value))
                    .collect(),
            ),
            QueryArg::Query(expr) => QueryArg::Query(Box::new(expr.substitute(placeholder, value))),
        }
    }
}

impl From<Atom> for QueryArg {
    fn from(atom: Atom) -> Self {
        QueryArg::Atom(atom)
    }
}

impl From<&Atom> for QueryArg {
    fn from(atom: &Atom) -> Self {
        QueryArg::Atom(atom.clone())
    }
}

impl From<&str> for QueryArg {
    fn from(name: &str) -> Self {
        QueryArg::Atom(Atom::new(name))
    }
}

impl From<AtomTuple> for QueryArg {
    fn from(tuple: AtomTuple) -> Self {
        QueryArg::List(tuple.iter().cloned().map(QueryArg::Atom).collect())
    }
}

impl<const N: usize> From<[&str; N]> for QueryArg {
    fn from(names: [&str; N]) -> Self {
        QueryArg::from(AtomTuple::from(names))
    }
}

impl From<Vec<QueryArg>> for QueryArg {
    fn from(items: Vec<QueryArg>) -> Self {
        QueryArg::List(items)
    }
}

impl From<QueryExpr> for QueryArg {
    fn from(expr: QueryExpr) -> Self {
        QueryArg::Query(Box::new(expr))
    }
}

/// One relation-name statement of a mutation batch: `[relation, tuple]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement(pub String, pub QueryArg);

impl Statement {
    pub fn new(relation: impl Into<String>, tuple: impl Into<QueryArg>) -> Self {
        Self(relation.into(), tuple.into())
    }

    /// Relation being mutated.
    pub fn relation(&self) -> &str {
        &self.0
    }

    /// The tuple argument, possibly containing nested queries.
    pub fn argument(&self) -> &QueryArg {
        &self.1
    }
}

/// A mutation batch: facts to relate and facts to unrelate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBatch {
    #[serde(default)]
    pub relate: Vec<Statement>,
    #[serde(default)]
    pub unrelate: Vec<Statement>,
}

impl EventBatch {
    /// An empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a relate statement.
    pub fn relate(mut self, relation: impl Into<String>, tuple: impl Into<QueryArg>) -> Self {
        self.relate.push(Statement::new(relation, tuple));
        self
    }

    /// Add an unrelate statement.
    pub fn unrelate(mut self, relation: impl Into<String>, tuple: impl Into<QueryArg>) -> Self {
        self.unrelate.push(Statement::new(relation, tuple));
        self
    }

    /// Whether the batch holds no statements.
    pub fn is_empty(&self) -> bool {
        self.relate.is_empty() && self.unrelate.is_empty()
    }

    /// Parse a batch from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_which() {
        let expr = QueryExpr::from_json(r#"{"which": ["locatedIn", "p"]}"#).unwrap();
        assert_eq!(expr, QueryExpr::which("locatedIn", "p"));
    }

    #[test]
    fn test_parse_nested() {
        let json = r#"{"and": [
            {"not": {"subjects": "isLocked"}},
            {"check": ["isNear", [{"firstWhich": ["locatedIn", "p"]}, "roomA"]]},
            {"parent": {"bool": {"propositions": "possesses"}}}
        ]}"#;
        let expr = QueryExpr::from_json(json).unwrap();
        let QueryExpr::And(clauses) = &expr else {
            panic!("expected and, got {expr:?}");
        };
        assert_eq!(clauses.len(), 3);
        assert_eq!(
            clauses[1],
            QueryExpr::check(
                "isNear",
                vec![
                    QueryArg::from(QueryExpr::first_which("locatedIn", "p")),
                    QueryArg::from("roomA"),
                ]
            )
        );
    }

    #[test]
    fn test_serialize_shape() {
        let expr = QueryExpr::any_which("possesses", QueryExpr::subjects("isPerson"));
        assert_eq!(
            expr.to_json().unwrap(),
            r#"{"anyWhich":["possesses",{"subjects":"isPerson"}]}"#
        );
    }

    #[test]
    fn test_unknown_clause_rejected() {
        assert!(QueryExpr::from_json(r#"{"maybe": "x"}"#).is_err());
        assert!(QueryExpr::from_json(r#"{"subjects": "a", "propositions": "b"}"#).is_err());
    }

    #[test]
    fn test_substitute() {
        let template = QueryExpr::and([
            QueryExpr::which("isNear", "$subject"),
            QueryExpr::not(QueryExpr::which("possesses", "$subject")),
        ]);
        let expr = template.substitute(&Atom::new("$subject"), &Atom::new("p"));
        assert_eq!(
            expr,
            QueryExpr::and([
                QueryExpr::which("isNear", "p"),
                QueryExpr::not(QueryExpr::which("possesses", "p")),
            ])
        );
    }

    #[test]
    fn test_event_batch_json() {
        let batch = EventBatch::from_json(
            r#"{"relate": [["locatedIn", ["p", "roomA"]]], "unrelate": [["isOpen", "door"]]}"#,
        )
        .unwrap();
        assert_eq!(
            batch,
            EventBatch::new()
                .relate("locatedIn", ["p", "roomA"])
                .unrelate("isOpen", "door")
        );

        let only_relate = EventBatch::from_json(r#"{"relate": [["exists", "bowl"]]}"#).unwrap();
        assert!(only_relate.unrelate.is_empty());
        assert!(!only_relate.is_empty());
    }
}

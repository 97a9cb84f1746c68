//! Derived relations - relations computed from a query per subject.

use std::fmt;
use std::sync::Arc;

use crate::atoms::Atom;
use crate::query::QueryExpr;

/// Atom replaced by the subject when a derived relation is declared by template.
pub const SUBJECT_PLACEHOLDER: &str = "$subject";

/// Builds the query answering `which(relation, subject)`.
pub type QueryBuilder = Arc<dyn Fn(&Atom) -> QueryExpr + Send + Sync>;

#[derive(Clone)]
enum Definition {
    Builder(QueryBuilder),
    Template(QueryExpr),
}

/// A relation with no table, answered by evaluating a query for each subject.
///
/// For arity 1 the query is read as a boolean; otherwise it must produce the
/// set of object tuples related to the subject.
#[derive(Clone)]
pub struct DerivedRelation {
    name: String,
    arity: usize,
    definition: Definition,
}

impl DerivedRelation {
    /// Declare a derived relation from a query-building closure.
    pub fn new(
        name: impl Into<String>,
        arity: usize,
        builder: impl Fn(&Atom) -> QueryExpr + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            definition: Definition::Builder(Arc::new(builder)),
        }
    }

    /// Declare a derived relation from a template mentioning [`SUBJECT_PLACEHOLDER`].
    pub fn from_template(name: impl Into<String>, arity: usize, template: QueryExpr) -> Self {
        Self {
            name: name.into(),
            arity,
            definition: Definition::Template(template),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// The query for `subject`.
    pub fn query_for(&self, subject: &Atom) -> QueryExpr {
        match &self.definition {
            Definition::Builder(builder) => builder(subject),
            Definition::Template(template) => {
                template.substitute(&Atom::new(SUBJECT_PLACEHOLDER), subject)
            }
        }
    }
}

impl fmt::Debug for DerivedRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let definition = match &self.definition {
            Definition::Builder(_) => "closure",
            Definition::Template(_) => "template",
        };
        f.debug_struct("DerivedRelation")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("definition", &definition)
            .finish()
    }
}

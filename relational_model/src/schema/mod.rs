//! Declaration schemas - models described in TOML.
//!
//! ```toml
//! atoms = ["p", "kitchen", "bowl"]
//!
//! [[relations]]
//! name = "locatedIn"
//! arity = 2
//!
//! [[invariants]]
//! kind = "unique"
//! relations = ["locatedIn"]
//!
//! [[derived]]
//! name = "isNear"
//! arity = 2
//! query = '{"anyWhich": ["locusOf", {"which": ["locatedIn", "$subject"]}]}'
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::invariants::{Invariant, InvariantKind};
use crate::model::{DerivedRelation, ModelBuilder};
use crate::query::{EventBatch, QueryExpr};

/// A base relation declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDecl {
    pub name: String,
    pub arity: usize,
}

/// An invariant declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantDecl {
    pub kind: InvariantKind,
    pub relations: Vec<String>,
}

/// A derived relation declared by a JSON query template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedDecl {
    pub name: String,
    pub arity: usize,
    /// Query in JSON form; the atom `$subject` stands for the subject.
    pub query: String,
}

/// Everything needed to build a model, as loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSchema {
    pub atoms: Vec<String>,
    pub relations: Vec<RelationDecl>,
    pub invariants: Vec<InvariantDecl>,
    pub derived: Vec<DerivedDecl>,
    /// JSON event batches asserted once the model is built.
    pub initial: Vec<String>,
}

impl ModelSchema {
    /// Parse a schema from TOML.
    pub fn from_toml(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Turn the schema into a builder; closure-based derived relations can
    /// still be added afterwards.
    pub fn into_builder(self) -> Result<ModelBuilder> {
        let mut builder = ModelBuilder::new()
            .atoms(self.atoms)
            .relations(self.relations.iter().map(|decl| (decl.name.as_str(), decl.arity)));

        for decl in &self.invariants {
            builder = builder.invariant(Invariant::from_kind(decl.kind, &decl.relations)?);
        }
        for decl in self.derived {
            let template = QueryExpr::from_json(&decl.query)?;
            builder = builder.derived_relation(DerivedRelation::from_template(
                decl.name, decl.arity, template,
            ));
        }
        for batch in &self.initial {
            builder = builder.initial_facts(EventBatch::from_json(batch)?);
        }
        Ok(builder)
    }
}

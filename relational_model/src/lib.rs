//! # Relational Model
//!
//! The source of truth for Urd worlds: a closed universe of atoms, named
//! relations over them, invariants that keep relations mutually consistent,
//! and a query algebra for reading (and deriving) facts.
//!
//! ## Core Components
//!
//! - **atoms**: `Atom` identifiers and flat `AtomTuple`s
//! - **collections**: `SemanticSet`/`SemanticMap` keyed by structural encoding
//! - **relation**: fixed-arity fact tables
//! - **invariants** / **resolution**: consistency rules and their fixpoint driver
//! - **query**: expressions, results and mutation batches
//! - **model**: relation contents, evaluation, freezing and memoization
//! - **schema**: declarations loaded from TOML
//!
//! This crate knows nothing about versions or observers; see `world_core`.

pub mod atoms;
pub mod collections;
pub mod error;
pub mod invariants;
pub mod model;
pub mod query;
pub mod relation;
pub mod resolution;
pub mod schema;

pub use atoms::*;
pub use collections::*;
pub use error::*;
pub use invariants::*;
pub use model::*;
pub use query::*;
pub use relation::*;
pub use resolution::*;
pub use schema::*;

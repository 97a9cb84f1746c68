//! Error types for the `relational_model` crate.
//!
//! Every failure here is a programmer or configuration error rather than a
//! transient fault: it aborts the current assertion or query and is handed
//! back to the caller unchanged.

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while declaring, mutating or querying a [`Model`](crate::Model).
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The name is declared neither as a base nor as a derived relation.
    #[error("unknown relation `{0}`")]
    UnknownRelation(String),

    /// A tuple's length does not match the relation's declared arity.
    #[error("wrong arity for relation `{relation}`: expected {expected}, found {found}")]
    ArityMismatch {
        /// Relation being accessed.
        relation: String,
        /// Declared arity.
        expected: usize,
        /// Length of the offending tuple.
        found: usize,
    },

    /// A relate and an unrelate of the same fact met inside one resolution cycle.
    #[error("contradictory triggers for {relation}{tuple}")]
    Contradiction {
        /// Relation of the contested fact.
        relation: String,
        /// The contested tuple.
        tuple: String,
    },

    /// `assert` was called on a frozen model.
    #[error("cannot add assertions to a frozen model")]
    FrozenMutation,

    /// A `which` subject expression resolved to more than one atom.
    #[error("`which` over `{relation}` requires at most one subject atom, got {count}")]
    AmbiguousSubject {
        /// Relation being queried.
        relation: String,
        /// Number of atoms the subject resolved to.
        count: usize,
    },

    /// A tuple references an atom outside the model's universe.
    #[error("unknown atom `{0}`")]
    UnknownAtom(String),

    /// A relation was declared with an arity the engine cannot store.
    #[error("invalid arity {arity} for relation `{relation}`")]
    InvalidArity {
        /// Declared relation.
        relation: String,
        /// Rejected arity.
        arity: usize,
    },

    /// The same relation name was declared twice.
    #[error("relation `{0}` declared more than once")]
    DuplicateRelation(String),

    /// An invariant references relations it cannot be maintained over.
    #[error("invalid {kind} invariant: {reason}")]
    InvalidInvariant {
        /// Invariant kind name.
        kind: &'static str,
        /// Why the declaration was rejected.
        reason: String,
    },

    /// Mutation targeted a derived relation, which has no table.
    #[error("relation `{0}` is derived and cannot be asserted")]
    ReadOnlyRelation(String),

    /// The query clause cannot be applied to this relation.
    #[error("invalid query `{clause}` for relation `{relation}`: {reason}")]
    UnsupportedQuery {
        /// Clause name, e.g. `which`.
        clause: &'static str,
        /// Relation being queried.
        relation: String,
        /// Why the clause does not apply.
        reason: String,
    },

    /// Operands of a clause have incompatible result kinds.
    #[error("type mismatch in `{clause}`: {reason}")]
    QueryTypeMismatch {
        /// Clause name.
        clause: &'static str,
        /// Description of the offending operands.
        reason: String,
    },

    /// An inverted set was asked to enumerate its members.
    #[error("cannot {operation} an inverted set")]
    UnboundedSet {
        /// The enumerating operation.
        operation: &'static str,
    },

    /// JSON encoding or decoding failed.
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A declaration schema could not be parsed.
    #[error("schema error: {0}")]
    Schema(#[from] toml::de::Error),
}

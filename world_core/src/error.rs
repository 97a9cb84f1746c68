//! Error types for the `world_core` crate.

use relational_model::ModelError;

use crate::sequence::Uid;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, WorldError>;

/// Errors raised by world transitions and the entity state ledger.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The underlying model rejected an assertion or query.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A state key was read or written without being declared.
    #[error("state key `{key}` is not declared for `{concept}`")]
    UndeclaredStateKey {
        /// Concept atom.
        concept: String,
        /// Offending key.
        key: String,
    },

    /// A key was set twice for one world, or a concept was written or
    /// committed again at an already committed world.
    #[error("`{concept}` at world {uid}: {detail}")]
    DoubleCommit {
        /// Concept atom.
        concept: String,
        /// World being written.
        uid: Uid,
        /// What was attempted twice.
        detail: String,
    },

    /// `commit` was called on a world that is already committed.
    #[error("world {uid} is already committed")]
    WorldAlreadyCommitted {
        /// World being committed.
        uid: Uid,
    },

    /// A world outside the concept's committed chain tried to commit.
    #[error("world {uid} cannot commit to `{concept}`: latest committed world {latest} is not its ancestor")]
    CrossLineageCommit {
        /// Concept atom.
        concept: String,
        /// World being committed.
        uid: Uid,
        /// Newest committed world of the concept.
        latest: Uid,
    },

    /// No concept is registered for the atom.
    #[error("no concept registered for `{0}`")]
    UnknownConcept(String),

    /// A concept was registered twice in one table.
    #[error("concept `{0}` registered more than once")]
    DuplicateConcept(String),

    /// Observers kept firing past the configured number of rounds.
    #[error("observers still firing after {rounds} rounds")]
    ObserverLoopExceeded {
        /// The configured cap.
        rounds: usize,
    },

    /// A logging filter directive could not be parsed.
    #[error("invalid log filter: {0}")]
    LogFilter(#[from] tracing_subscriber::filter::ParseError),

    /// A global subscriber is already installed.
    #[error("cannot install subscriber: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    /// World configuration could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_errors_pass_through() {
        let err: WorldError = ModelError::FrozenMutation.into();
        assert_eq!(err.to_string(), "cannot add assertions to a frozen model");
    }

    #[test]
    fn test_cross_lineage_message() {
        let err = WorldError::CrossLineageCommit {
            concept: "vendingMachine".to_string(),
            uid: Uid(5),
            latest: Uid(3),
        };
        assert_eq!(
            err.to_string(),
            "world 5 cannot commit to `vendingMachine`: latest committed world 3 is not its ancestor"
        );
    }
}

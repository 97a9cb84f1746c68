//! Concepts - stateful entities with a per-version state ledger.
//!
//! A concept declares its state keys and their defaults once. Worlds write
//! values against their own uid and then commit; reads "as of" a world see
//! the newest committed entry at or below that world's uid in its ancestry.

mod table;

pub use table::*;
pub(crate) use table::SealedWorld;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use relational_model::Atom;

use crate::error::{Result, WorldError};
use crate::sequence::{LineageId, Uid};

/// A value stored under a concept's state key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        StateValue::Bool(value)
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        StateValue::Int(value)
    }
}

impl From<i32> for StateValue {
    fn from(value: i32) -> Self {
        StateValue::Int(i64::from(value))
    }
}

impl From<f64> for StateValue {
    fn from(value: f64) -> Self {
        StateValue::Float(value)
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        StateValue::Text(value.to_string())
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        StateValue::Text(value)
    }
}

impl std::fmt::Display for StateValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateValue::Bool(value) => write!(f, "{value}"),
            StateValue::Int(value) => write!(f, "{value}"),
            StateValue::Float(value) => write!(f, "{value}"),
            StateValue::Text(value) => write!(f, "{value}"),
        }
    }
}

/// A version the ledger can be read and written at.
pub trait VersionView {
    /// This version's uid.
    fn uid(&self) -> Uid;

    /// The lineage the version belongs to.
    fn lineage(&self) -> LineageId;

    /// Whether `uid` is this version or one of its ancestors.
    fn descends_from(&self, uid: Uid) -> bool;
}

type StateMap = BTreeMap<String, StateValue>;

#[derive(Debug, Default)]
struct Ledger {
    /// Sealed state per committed world, ascending by uid.
    committed: BTreeMap<Uid, StateMap>,
    /// Values set on worlds that have not committed yet.
    pending: BTreeMap<Uid, StateMap>,
    lineage: Option<LineageId>,
}

impl Ledger {
    /// Newest committed entry at or below `world` in its ancestry.
    fn visible(&self, world: &dyn VersionView) -> Option<&StateMap> {
        self.committed
            .range(..=world.uid())
            .rev()
            .find(|(uid, _)| world.descends_from(**uid))
            .map(|(_, state)| state)
    }
}

/// A stateful entity identified by an atom.
#[derive(Debug)]
pub struct Concept {
    atom: Atom,
    defaults: StateMap,
    ledger: RwLock<Ledger>,
}

impl Concept {
    /// Create a concept with no state keys.
    pub fn new(atom: impl Into<Atom>) -> Self {
        Self {
            atom: atom.into(),
            defaults: StateMap::new(),
            ledger: RwLock::new(Ledger::default()),
        }
    }

    /// Declare a state key and its default value.
    pub fn with_state(mut self, key: impl Into<String>, default: impl Into<StateValue>) -> Self {
        self.defaults.insert(key.into(), default.into());
        self
    }

    /// The concept's atom.
    pub fn atom(&self) -> &Atom {
        &self.atom
    }

    /// Declared state keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.defaults.keys().map(String::as_str)
    }

    /// Whether any state is declared.
    pub fn has_state(&self) -> bool {
        !self.defaults.is_empty()
    }

    /// Declared default for `key`.
    pub fn default_value(&self, key: &str) -> Option<&StateValue> {
        self.defaults.get(key)
    }

    fn read(&self) -> RwLockReadGuard<'_, Ledger> {
        self.ledger.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Ledger> {
        self.ledger.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn declared(&self, key: &str) -> Result<&StateValue> {
        self.defaults
            .get(key)
            .ok_or_else(|| WorldError::UndeclaredStateKey {
                concept: self.atom.to_string(),
                key: key.to_string(),
            })
    }

    fn double_commit(&self, uid: Uid, detail: String) -> WorldError {
        WorldError::DoubleCommit {
            concept: self.atom.to_string(),
            uid,
            detail,
        }
    }

    /// The value of `key` as of `world`.
    ///
    /// Values set on `world` itself are not visible until it commits.
    pub fn get_state(&self, world: &dyn VersionView, key: &str) -> Result<StateValue> {
        let default = self.declared(key)?;
        let ledger = self.read();
        let value = ledger
            .visible(world)
            .and_then(|state| state.get(key))
            .unwrap_or(default);
        Ok(value.clone())
    }

    /// Set `key` for the uncommitted `world`. Each key can be set once per world.
    pub fn set_state(
        &self,
        world: &dyn VersionView,
        key: &str,
        value: impl Into<StateValue>,
    ) -> Result<()> {
        self.declared(key)?;
        let uid = world.uid();
        let mut ledger = self.write();
        if ledger.committed.contains_key(&uid) {
            return Err(self.double_commit(uid, "world is already committed".to_string()));
        }
        let pending = ledger.pending.entry(uid).or_default();
        if pending.contains_key(key) {
            return Err(self.double_commit(uid, format!("state key `{key}` already set")));
        }
        pending.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Whether `uid` has been committed.
    pub fn is_committed(&self, uid: Uid) -> bool {
        self.read().committed.contains_key(&uid)
    }

    /// Uids holding values that have not been committed yet, ascending.
    pub fn pending_versions(&self) -> Vec<Uid> {
        self.read().pending.keys().copied().collect()
    }

    /// Committed uids, ascending.
    pub fn committed_versions(&self) -> Vec<Uid> {
        self.read().committed.keys().copied().collect()
    }

    /// Check that `world` may commit, without changing anything.
    pub fn validate_commit(&self, world: &dyn VersionView) -> Result<()> {
        let ledger = self.read();
        self.check_commit(&ledger, world)
    }

    fn check_commit(&self, ledger: &Ledger, world: &dyn VersionView) -> Result<()> {
        let uid = world.uid();
        if ledger.committed.contains_key(&uid) {
            return Err(self.double_commit(uid, "world is already committed".to_string()));
        }
        let latest = ledger.committed.keys().next_back().copied();
        let foreign_lineage = ledger.lineage.is_some_and(|lineage| lineage != world.lineage());
        match latest {
            Some(latest) if foreign_lineage || !world.descends_from(latest) => {
                Err(WorldError::CrossLineageCommit {
                    concept: self.atom.to_string(),
                    uid,
                    latest,
                })
            }
            _ => Ok(()),
        }
    }

    /// Seal `world`'s state: its own values, then the previous committed
    /// values, then declared defaults for anything still unset.
    pub fn commit_world(&self, world: &dyn VersionView) -> Result<()> {
        self.seal(world).map(drop)
    }

    /// [`commit_world`](Self::commit_world), keeping what is needed to undo it.
    pub(crate) fn seal(&self, world: &dyn VersionView) -> Result<Unseal> {
        let mut ledger = self.write();
        self.check_commit(&ledger, world)?;

        let uid = world.uid();
        let own = ledger.pending.remove(&uid);
        let mut state = own.clone().unwrap_or_default();
        if let Some((_, previous)) = ledger.committed.iter().next_back() {
            for (key, value) in previous {
                state.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        for (key, value) in &self.defaults {
            state.entry(key.clone()).or_insert_with(|| value.clone());
        }

        // Older uids can no longer descend from the newest commit.
        let live = ledger.pending.split_off(&uid);
        let discarded = std::mem::replace(&mut ledger.pending, live);

        tracing::trace!(
            concept = %self.atom,
            uid = %uid,
            discarded = discarded.len(),
            "committed concept state"
        );
        let lineage = ledger.lineage.replace(world.lineage());
        ledger.committed.insert(uid, state);
        Ok(Unseal {
            uid,
            own,
            discarded,
            lineage,
        })
    }

    /// Put the ledger back as it was before the matching [`seal`](Self::seal).
    pub(crate) fn unseal(&self, undo: Unseal) {
        let mut ledger = self.write();
        ledger.committed.remove(&undo.uid);
        ledger.pending.extend(undo.discarded);
        if let Some(own) = undo.own {
            ledger.pending.insert(undo.uid, own);
        }
        ledger.lineage = undo.lineage;
        tracing::trace!(concept = %self.atom, uid = %undo.uid, "reverted concept commit");
    }
}

/// What one [`Concept::seal`] changed.
#[derive(Debug)]
pub(crate) struct Unseal {
    uid: Uid,
    own: Option<StateMap>,
    discarded: BTreeMap<Uid, StateMap>,
    lineage: Option<LineageId>,
}

//! Entity-state observers.

use std::fmt;
use std::sync::Arc;

use relational_model::{Atom, EventBatch, Model, QueryExpr};

use crate::concept::{ConceptTable, StateValue, VersionView};
use crate::error::Result;

/// Called with the model when every condition of a state observer holds.
pub type StateEffect = Arc<dyn Fn(&Model) -> Vec<EventBatch> + Send + Sync>;

/// Expected value of one concept's state key.
#[derive(Debug, Clone, PartialEq)]
pub struct StateCondition {
    pub concept: Atom,
    pub key: String,
    pub value: StateValue,
}

/// Fires when listed state readings equal their targets and an optional
/// model condition holds.
#[derive(Clone)]
pub struct StateObserver {
    conditions: Vec<StateCondition>,
    model_condition: Option<QueryExpr>,
    effect: StateEffect,
}

impl StateObserver {
    pub fn new(effect: impl Fn(&Model) -> Vec<EventBatch> + Send + Sync + 'static) -> Self {
        Self {
            conditions: Vec::new(),
            model_condition: None,
            effect: Arc::new(effect),
        }
    }

    /// Require `concept.key == value`.
    pub fn when(
        mut self,
        concept: impl Into<Atom>,
        key: impl Into<String>,
        value: impl Into<StateValue>,
    ) -> Self {
        self.conditions.push(StateCondition {
            concept: concept.into(),
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Also require `condition` to be truthy on the model.
    pub fn with_model_condition(mut self, condition: QueryExpr) -> Self {
        self.model_condition = Some(condition);
        self
    }

    pub fn conditions(&self) -> &[StateCondition] {
        &self.conditions
    }

    /// Whether every condition holds as of `version`.
    pub fn holds(
        &self,
        concepts: &ConceptTable,
        version: &dyn VersionView,
        model: &Model,
    ) -> Result<bool> {
        for condition in &self.conditions {
            let concept = concepts.get(&condition.concept)?;
            if concept.get_state(version, &condition.key)? != condition.value {
                return Ok(false);
            }
        }
        match &self.model_condition {
            Some(query) => Ok(model.query(query)?.truthy()),
            None => Ok(true),
        }
    }

    /// Run the effect if the observer's conditions hold.
    pub fn consider(
        &self,
        concepts: &ConceptTable,
        version: &dyn VersionView,
        model: &Model,
    ) -> Result<Option<Vec<EventBatch>>> {
        if self.holds(concepts, version, model)? {
            Ok(Some((self.effect)(model)))
        } else {
            Ok(None)
        }
    }
}

impl fmt::Debug for StateObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateObserver")
            .field("conditions", &self.conditions)
            .field("model_condition", &self.model_condition)
            .finish_non_exhaustive()
    }
}

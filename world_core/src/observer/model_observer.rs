//! Query-based observers.

use std::fmt;
use std::sync::Arc;

use relational_model::{EventBatch, Model, QueryExpr, QueryValue};

use crate::error::Result;

/// Called with (new value, old value, model) when a watched query changes.
pub type ModelEffect = Arc<dyn Fn(&QueryValue, &QueryValue, &Model) -> Vec<EventBatch> + Send + Sync>;

/// Watches one query and fires when its value changes.
#[derive(Clone)]
pub struct ModelObserver {
    query: QueryExpr,
    effect: ModelEffect,
}

impl ModelObserver {
    pub fn new(
        query: QueryExpr,
        effect: impl Fn(&QueryValue, &QueryValue, &Model) -> Vec<EventBatch> + Send + Sync + 'static,
    ) -> Self {
        Self {
            query,
            effect: Arc::new(effect),
        }
    }

    /// The watched query.
    pub fn query(&self) -> &QueryExpr {
        &self.query
    }

    /// Capture the value before a round.
    pub fn prepare(&self, model: &Model) -> Result<QueryValue> {
        Ok(model.query(&self.query)?)
    }

    /// Re-evaluate after a round; runs the effect if the value is no longer
    /// identical to `before`.
    pub fn consider(&self, before: &QueryValue, model: &Model) -> Result<Option<Vec<EventBatch>>> {
        let after = model.query(&self.query)?;
        if after.identical(before) {
            return Ok(None);
        }
        Ok(Some((self.effect)(&after, before, model)))
    }
}

impl fmt::Debug for ModelObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelObserver")
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

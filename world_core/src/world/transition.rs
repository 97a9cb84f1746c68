//! The transition loop shared by genesis and `event`.

use relational_model::{EventBatch, Model, ModelError, QueryValue};

use super::{Lineage, World};
use crate::concept::VersionView;
use crate::error::{Result, WorldError};
use crate::observer::Observer;
use crate::sequence::{LineageId, Uid};

/// The world being built, before it exists.
pub(super) struct PendingVersion<'a> {
    pub uid: Uid,
    pub lineage: LineageId,
    pub parent: Option<&'a World>,
}

impl VersionView for PendingVersion<'_> {
    fn uid(&self) -> Uid {
        self.uid
    }

    fn lineage(&self) -> LineageId {
        self.lineage
    }

    fn descends_from(&self, uid: Uid) -> bool {
        uid == self.uid || self.parent.is_some_and(|parent| parent.descends_from(uid))
    }
}

/// Apply `batch` to `model`, then run observer rounds until none fires.
///
/// Returns the settled model and the number of extra rounds observers caused.
/// Each state observer fires at most once per transition.
pub(super) fn run_transition(
    mut model: Model,
    version: &PendingVersion<'_>,
    lineage: &Lineage,
    batch: &EventBatch,
) -> Result<(Model, usize)> {
    let observers = &lineage.observers;
    let max_rounds = lineage.config.max_observer_rounds;
    let mut state_fired = vec![false; observers.len()];
    let mut batches = vec![batch.clone()];
    let mut rounds = 0;

    loop {
        let before = observers
            .iter()
            .map(|observer| match observer {
                Observer::Model(observer) => observer.prepare(&model).map(Some),
                Observer::State(_) => Ok(None),
            })
            .collect::<Result<Vec<Option<QueryValue>>>>()?;

        for batch in &batches {
            apply(&mut model, batch, version.uid)?;
        }

        let mut fired = false;
        let mut emitted = Vec::new();
        for (index, observer) in observers.iter().enumerate() {
            let output = match (observer, &before[index]) {
                (Observer::Model(observer), Some(before)) => observer.consider(before, &model)?,
                (Observer::State(observer), _) if !state_fired[index] => {
                    let output = observer.consider(&lineage.concepts, version, &model)?;
                    state_fired[index] = output.is_some();
                    output
                }
                _ => None,
            };
            if let Some(batches) = output {
                tracing::debug!(uid = %version.uid, observer = index, batches = batches.len(), "observer fired");
                fired = true;
                emitted.extend(batches);
            }
        }

        if !fired {
            return Ok((model, rounds));
        }
        if rounds == max_rounds {
            tracing::warn!(uid = %version.uid, rounds, "observer round cap reached");
            return Err(WorldError::ObserverLoopExceeded { rounds });
        }
        rounds += 1;
        batches = emitted;
    }
}

fn apply(model: &mut Model, batch: &EventBatch, uid: Uid) -> Result<()> {
    match model.assert(batch) {
        Ok(changed) => {
            tracing::trace!(uid = %uid, changed, "asserted batch");
            Ok(())
        }
        Err(error @ ModelError::Contradiction { .. }) => {
            tracing::warn!(uid = %uid, %error, "transition rejected");
            Err(error.into())
        }
        Err(error) => Err(error.into()),
    }
}

//! Observers - watchers that answer state changes with further events.
//!
//! Observers run after every resolution cycle of a transition. Whatever they
//! emit is asserted in a new round, and rounds repeat until no observer
//! fires or [`WorldConfig::max_observer_rounds`](crate::WorldConfig) is hit.

mod model_observer;
mod state_observer;

pub use model_observer::*;
pub use state_observer::*;

/// Any observer a world can carry.
#[derive(Debug, Clone)]
pub enum Observer {
    Model(ModelObserver),
    State(StateObserver),
}

impl From<ModelObserver> for Observer {
    fn from(observer: ModelObserver) -> Self {
        Observer::Model(observer)
    }
}

impl From<StateObserver> for Observer {
    fn from(observer: StateObserver) -> Self {
        Observer::State(observer)
    }
}

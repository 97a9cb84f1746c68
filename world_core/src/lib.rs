//! # World Core
//!
//! Versioned Urd worlds built on `relational_model`. A world is a frozen
//! model snapshot stamped with a uid; `event` derives the next one, running
//! observers until the model settles. Concepts carry per-entity state in an
//! MVCC ledger keyed by world uid.
//!
//! ## Core Components
//!
//! - **world**: `World`, its builder and the transition loop
//! - **observer**: model observers (watched queries) and state observers
//! - **concept**: entity state ledgers and the lineage's concept table
//! - **sequence**: uid and lineage identifiers
//! - **config** / **logging**: TOML settings and `tracing` setup
//!
//! ## Example
//!
//! ```
//! use relational_model::{EventBatch, Invariant, Model};
//! use world_core::World;
//!
//! let model = Model::builder()
//!     .atoms(["p", "roomA", "roomB"])
//!     .relation("locatedIn", 2)
//!     .invariant(Invariant::unique("locatedIn"))
//!     .build()?;
//! let w1 = World::builder(model)
//!     .genesis(&EventBatch::new().relate("locatedIn", ["p", "roomA"]))?;
//! let w2 = w1.next(&EventBatch::new().relate("locatedIn", ["p", "roomB"]))?;
//!
//! assert!(w1.check("locatedIn", ["p", "roomA"])?);
//! assert!(!w2.check("locatedIn", ["p", "roomA"])?);
//! # Ok::<(), world_core::WorldError>(())
//! ```

pub mod concept;
pub mod config;
pub mod error;
pub mod logging;
pub mod observer;
pub mod sequence;
pub mod world;

pub use concept::*;
pub use config::*;
pub use error::*;
pub use observer::*;
pub use sequence::*;
pub use world::*;

//! Core types for the provisioning procedure: catalog model, store seam,
//! settings and the step pipeline.

pub mod catalog;
pub mod error;
pub mod pipeline;
pub mod settings;
pub mod step;
pub mod store;

pub use catalog::{
    Catalog, CollectionSpec, Creation, DatabaseSpec, Direction, IndexSpec, PrincipalSpec, Role,
};
pub use error::{BootstrapError, DuplicateTarget, StoreError};
pub use pipeline::{BootstrapReport, Pipeline};
pub use step::{Phase, Step, StepCtx, Tally};
pub use store::{reconcile_index, DatabaseHandle, Ensured, ExistingIndex, Store};

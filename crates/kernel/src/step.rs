use std::fmt;
use std::ops::AddAssign;

use async_trait::async_trait;

use crate::catalog::Catalog;
use crate::error::StoreError;
use crate::settings::BootstrapSettings;
use crate::store::{DatabaseHandle, Ensured, Store};

/// Linear progress of a bootstrap run. Variants are declared in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Phase {
    #[default]
    Pending,
    Authenticated,
    DatabasesSelected,
    DataSeeded,
    IndexesBuilt,
    PrincipalsCreated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Pending => "pending",
            Phase::Authenticated => "authenticated",
            Phase::DatabasesSelected => "databases-selected",
            Phase::DataSeeded => "data-seeded",
            Phase::IndexesBuilt => "indexes-built",
            Phase::PrincipalsCreated => "principals-created",
        };
        f.write_str(label)
    }
}

/// Context handed to every step
pub struct StepCtx<'a> {
    pub store: &'a dyn Store,
    pub catalog: &'a Catalog,
    pub settings: &'a BootstrapSettings,
}

impl<'a> StepCtx<'a> {
    /// Handle scoped to one database of the catalog.
    pub fn database(&self, name: &'a str) -> DatabaseHandle<'a> {
        DatabaseHandle::new(self.store, name)
    }
}

/// Counters accumulated across steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub collections_created: usize,
    pub collections_existing: usize,
    pub documents_inserted: usize,
    pub collections_already_seeded: usize,
    pub indexes_created: usize,
    pub indexes_existing: usize,
    pub principals_created: usize,
    pub principals_existing: usize,
}

impl Tally {
    pub fn record_collection(&mut self, outcome: Ensured) {
        match outcome {
            Ensured::Created => self.collections_created += 1,
            Ensured::AlreadyExists => self.collections_existing += 1,
        }
    }

    pub fn record_index(&mut self, outcome: Ensured) {
        match outcome {
            Ensured::Created => self.indexes_created += 1,
            Ensured::AlreadyExists => self.indexes_existing += 1,
        }
    }
}

impl AddAssign for Tally {
    fn add_assign(&mut self, other: Self) {
        self.collections_created += other.collections_created;
        self.collections_existing += other.collections_existing;
        self.documents_inserted += other.documents_inserted;
        self.collections_already_seeded += other.collections_already_seeded;
        self.indexes_created += other.indexes_created;
        self.indexes_existing += other.indexes_existing;
        self.principals_created += other.principals_created;
        self.principals_existing += other.principals_existing;
    }
}

/// One stage of the bootstrap procedure
#[async_trait]
pub trait Step: Sync + Send {
    /// Unique name for this step
    fn name(&self) -> &'static str;

    /// Phase the run has reached once this step succeeds
    fn phase(&self) -> Phase;

    /// Execute against the store. Any returned error ends the run.
    async fn run(&self, ctx: &StepCtx<'_>) -> Result<Tally, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_are_ordered() {
        assert!(Phase::Pending < Phase::Authenticated);
        assert!(Phase::DataSeeded < Phase::IndexesBuilt);
        assert!(Phase::IndexesBuilt < Phase::PrincipalsCreated);
    }

    #[test]
    fn tallies_add_up() {
        let mut total = Tally::default();
        let mut step = Tally::default();
        step.record_index(Ensured::Created);
        step.record_index(Ensured::AlreadyExists);
        step.documents_inserted = 5;
        total += step;
        total += step;
        assert_eq!(total.indexes_created, 2);
        assert_eq!(total.indexes_existing, 2);
        assert_eq!(total.documents_inserted, 10);
    }
}

use async_trait::async_trait;
use provision_kernel::{DuplicateTarget, Phase, Step, StepCtx, StoreError, Tally};

/// Declares every catalogued index. Requests for an index that already exists
/// in equivalent form are counted, not failed.
pub struct BuildIndexes;

impl BuildIndexes {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Step for BuildIndexes {
    fn name(&self) -> &'static str {
        "build_indexes"
    }

    fn phase(&self) -> Phase {
        Phase::IndexesBuilt
    }

    async fn run(&self, ctx: &StepCtx<'_>) -> Result<Tally, StoreError> {
        let catalog = ctx.catalog;
        let mut tally = Tally::default();

        for (spec, collection) in catalog.collections().filter(|(_, c)| !c.indexes.is_empty()) {
            let database = ctx.database(&spec.name);

            for index in &collection.indexes {
                match database.create_index(&collection.name, index).await {
                    Ok(outcome) => tally.record_index(outcome),
                    Err(StoreError::DuplicateKey {
                        target: DuplicateTarget::Index,
                        message,
                    }) => {
                        tracing::warn!(
                            database = database.name(),
                            collection = %collection.name,
                            index = %index.name(),
                            %message,
                            "equivalent index already present, skipping"
                        );
                        tally.indexes_existing += 1;
                    }
                    Err(other) => return Err(other),
                }
            }

            tracing::info!(
                database = database.name(),
                collection = %collection.name,
                count = collection.indexes.len(),
                "indexes ensured"
            );
        }

        Ok(tally)
    }
}

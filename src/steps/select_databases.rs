use async_trait::async_trait;
use provision_kernel::{Creation, Ensured, Phase, Step, StepCtx, StoreError, Tally};

/// Creates the collections the catalog names explicitly. Databases come into
/// existence with their first collection.
pub struct SelectDatabases;

impl SelectDatabases {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Step for SelectDatabases {
    fn name(&self) -> &'static str {
        "select_databases"
    }

    fn phase(&self) -> Phase {
        Phase::DatabasesSelected
    }

    async fn run(&self, ctx: &StepCtx<'_>) -> Result<Tally, StoreError> {
        let catalog = ctx.catalog;
        let mut tally = Tally::default();

        for spec in &catalog.databases {
            let database = ctx.database(&spec.name);

            for collection in spec
                .collections
                .iter()
                .filter(|c| c.creation == Creation::Explicit)
            {
                let outcome = database.create_collection(&collection.name).await?;
                tally.record_collection(outcome);
                if outcome == Ensured::AlreadyExists {
                    tracing::info!(
                        database = database.name(),
                        collection = %collection.name,
                        "collection already exists"
                    );
                }
            }

            tracing::info!(database = database.name(), "{} database ready", database.name());
        }

        Ok(tally)
    }
}

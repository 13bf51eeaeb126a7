use async_trait::async_trait;
use provision_kernel::{Phase, Step, StepCtx, StoreError, Tally};

use crate::seed::with_identifier;

/// Inserts each collection's seed batch, giving every document a fresh `_id`.
///
/// A collection that already holds documents is left alone unless reseeding is
/// configured, so a second run does not duplicate the sample data.
pub struct SeedData;

impl SeedData {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Step for SeedData {
    fn name(&self) -> &'static str {
        "seed_data"
    }

    fn phase(&self) -> Phase {
        Phase::DataSeeded
    }

    async fn run(&self, ctx: &StepCtx<'_>) -> Result<Tally, StoreError> {
        let catalog = ctx.catalog;
        let mut tally = Tally::default();

        for (spec, collection) in catalog.collections().filter(|(_, c)| !c.seed.is_empty()) {
            let database = ctx.database(&spec.name);

            if !ctx.settings.reseed {
                let existing = database.count_documents(&collection.name).await?;
                if existing > 0 {
                    tracing::info!(
                        database = database.name(),
                        collection = %collection.name,
                        existing,
                        "collection already seeded, skipping"
                    );
                    tally.collections_already_seeded += 1;
                    continue;
                }
            }

            let documents = collection
                .seed
                .iter()
                .cloned()
                .map(with_identifier)
                .collect();
            let inserted = database
                .insert_documents(&collection.name, documents)
                .await?;
            tally.documents_inserted += inserted;

            tracing::info!(
                database = database.name(),
                collection = %collection.name,
                inserted,
                "seed documents inserted"
            );
        }

        Ok(tally)
    }
}

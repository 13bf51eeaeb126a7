//! One-shot bootstrap of a MongoDB deployment: databases, seed documents,
//! indexes and scoped principals from a fixed catalog.

pub mod catalog;
pub mod layout;
pub mod seed;
pub mod steps;

use provision_kernel::settings::BootstrapSettings;
use provision_kernel::{BootstrapError, BootstrapReport, Catalog, Pipeline, StepCtx, Store};

pub use layout::Layout;

/// Pipeline with every bootstrap step registered
pub fn pipeline() -> Pipeline {
    let mut pipeline = Pipeline::new();
    steps::register_all(&mut pipeline);
    pipeline
}

/// Run the procedure once against `store`, bounded by the configured timeout.
pub async fn bootstrap(
    store: &dyn Store,
    catalog: &Catalog,
    settings: &BootstrapSettings,
) -> Result<BootstrapReport, BootstrapError> {
    tracing::info!(
        databases = catalog.databases.len(),
        collections = catalog.collection_count(),
        indexes = catalog.index_count(),
        seed_documents = catalog.seed_count(),
        "catalog loaded"
    );

    let ctx = StepCtx {
        store,
        catalog,
        settings,
    };
    let report = pipeline()
        .run_with_timeout(&ctx, settings.timeout())
        .await?;

    let tally = &report.tally;
    tracing::info!(
        phase = %report.phase,
        elapsed_ms = report.elapsed.as_millis() as u64,
        documents_inserted = tally.documents_inserted,
        collections_already_seeded = tally.collections_already_seeded,
        indexes_created = tally.indexes_created,
        indexes_existing = tally.indexes_existing,
        principals_created = tally.principals_created,
        principals_existing = tally.principals_existing,
        "database initialization completed successfully"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_registers_five_steps_in_order() {
        let pipeline = pipeline();
        let names: Vec<_> = pipeline.steps().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "authenticate",
                "select_databases",
                "seed_data",
                "build_indexes",
                "create_principals",
            ]
        );
    }
}

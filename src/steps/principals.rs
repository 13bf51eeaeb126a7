use async_trait::async_trait;
use provision_kernel::{DuplicateTarget, Phase, Step, StepCtx, StoreError, Tally};

/// Creates one read-write principal per database, scoped to that database.
/// A principal left over from an earlier run is logged and skipped.
pub struct CreatePrincipals;

impl CreatePrincipals {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Step for CreatePrincipals {
    fn name(&self) -> &'static str {
        "create_principals"
    }

    fn phase(&self) -> Phase {
        Phase::PrincipalsCreated
    }

    async fn run(&self, ctx: &StepCtx<'_>) -> Result<Tally, StoreError> {
        let catalog = ctx.catalog;
        let mut tally = Tally::default();

        for spec in &catalog.databases {
            let database = ctx.database(&spec.name);
            let principal = &spec.principal;

            match database.create_principal(principal).await {
                Ok(()) => {
                    tally.principals_created += 1;
                    tracing::info!(
                        database = database.name(),
                        principal = %principal.name,
                        role = %principal.role,
                        "principal created"
                    );
                }
                Err(StoreError::DuplicateKey {
                    target: DuplicateTarget::Principal,
                    message,
                }) => {
                    tally.principals_existing += 1;
                    tracing::warn!(
                        database = database.name(),
                        principal = %principal.name,
                        %message,
                        "principal already exists, skipping"
                    );
                }
                Err(other) => return Err(other),
            }
        }

        Ok(tally)
    }
}

use async_trait::async_trait;
use provision_kernel::{Phase, Step, StepCtx, StoreError, Tally};

/// Proves the administrative credential before anything is written.
pub struct Authenticate;

impl Authenticate {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Step for Authenticate {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    fn phase(&self) -> Phase {
        Phase::Authenticated
    }

    async fn run(&self, ctx: &StepCtx<'_>) -> Result<Tally, StoreError> {
        ctx.store.authenticate().await?;
        tracing::info!(backend = ctx.store.backend(), "authenticated as administrative principal");
        Ok(Tally::default())
    }
}

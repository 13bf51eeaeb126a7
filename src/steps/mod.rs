//! The five stages of the bootstrap procedure.

pub mod authenticate;
pub mod indexes;
pub mod principals;
pub mod seed_data;
pub mod select_databases;

use std::sync::Arc;

use provision_kernel::Pipeline;

pub use authenticate::Authenticate;
pub use indexes::BuildIndexes;
pub use principals::CreatePrincipals;
pub use seed_data::SeedData;
pub use select_databases::SelectDatabases;

/// Register every step with the pipeline
pub fn register_all(pipeline: &mut Pipeline) {
    pipeline.register(Arc::new(Authenticate::new()));
    pipeline.register(Arc::new(SelectDatabases::new()));
    pipeline.register(Arc::new(SeedData::new()));
    pipeline.register(Arc::new(BuildIndexes::new()));
    pipeline.register(Arc::new(CreatePrincipals::new()));
}

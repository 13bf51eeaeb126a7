//! Store implementations: the MongoDB driver for real runs and an in-memory
//! store for dry runs and tests.

pub mod memory;
pub mod mongo;

pub use memory::{FailureMode, MemoryStore};
pub use mongo::MongoStore;

//! Storage layer: the Mapping Store (C2), realized as an embedded SQLite
//! database.

pub mod mapping_store;
pub mod pool;

pub use mapping_store::MappingStore;
pub use pool::{create_pool, DbPool};

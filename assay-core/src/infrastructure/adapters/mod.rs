// assay-core/src/infrastructure/adapters/mod.rs

pub mod duckdb;
pub mod memory;

pub use self::duckdb::DuckDbSource;
pub use memory::InMemorySource;

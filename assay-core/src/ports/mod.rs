// assay-core/src/ports/mod.rs

pub mod row_source;

pub use row_source::RowSource;

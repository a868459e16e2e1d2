// assay-core/src/infrastructure/config/mod.rs

pub mod project;
pub mod schema;
pub mod source;

pub use crate::domain::project::ProjectConfig;
pub use project::load_project_config;
pub use schema::{ColumnSchema, ModelSchema, SchemaFile, TestSpec, parse_ref};
pub use source::resolve_csv_sources;

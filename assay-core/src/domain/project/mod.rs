// assay-core/src/domain/project/mod.rs

pub mod configuration;
pub mod model;
pub mod registry;

pub use configuration::ProjectConfig;
pub use model::{Column, Constraint, MaterializationType, Model};
pub use registry::ModelRegistry;

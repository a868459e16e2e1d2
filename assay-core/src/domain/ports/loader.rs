use crate::domain::project::ModelRegistry;
use crate::domain::project::configuration::ProjectConfig;
use crate::error::AssayError;
use std::path::Path;

/// Builds the registry from whatever declarative definitions a project holds.
pub trait RegistryLoader: Send + Sync {
    fn load(&self, root: &Path, config: &ProjectConfig) -> Result<ModelRegistry, AssayError>;
}

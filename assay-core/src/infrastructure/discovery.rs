// assay-core/src/infrastructure/discovery.rs

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use crate::domain::ports::RegistryLoader;
use crate::domain::project::{ModelRegistry, ProjectConfig};
use crate::error::AssayError;
use crate::infrastructure::config::SchemaFile;
use crate::infrastructure::error::InfrastructureError;

/// Builds the [`ModelRegistry`] from the `.yml` schema files under each model path.
pub struct SchemaDiscovery;

impl RegistryLoader for SchemaDiscovery {
    fn load(&self, root: &Path, config: &ProjectConfig) -> Result<ModelRegistry, AssayError> {
        Self::discover(root, config)
    }
}

impl SchemaDiscovery {
    #[instrument(skip_all, fields(project = %config.name))]
    pub fn discover(
        project_dir: &Path,
        config: &ProjectConfig,
    ) -> Result<ModelRegistry, AssayError> {
        let mut registry = ModelRegistry::new();

        for schema_path in Self::schema_files(project_dir, &config.model_paths) {
            debug!(path = ?schema_path, "Reading schema file");
            let content = fs::read_to_string(&schema_path).map_err(InfrastructureError::Io)?;
            let parsed: SchemaFile =
                serde_yaml::from_str(&content).map_err(|source| InfrastructureError::YamlError {
                    path: schema_path.display().to_string(),
                    source,
                })?;

            for schema in parsed.models {
                registry.register(schema.into_model()?)?;
            }
        }

        info!(models = registry.len(), "Model registry loaded");
        Ok(registry)
    }

    /// Sorted so that duplicate detection always blames the same file.
    fn schema_files(project_dir: &Path, model_paths: &[String]) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for model_path in model_paths {
            let dir = project_dir.join(model_path);
            if !dir.exists() {
                debug!(path = ?dir, "Model path does not exist, skipping");
                continue;
            }

            let walker = WalkDir::new(&dir).follow_links(true).sort_by_file_name();
            for entry in walker.into_iter().filter_map(|e| e.ok()) {
                let path = entry.path();
                if entry.file_type().is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext == "yml" || ext == "yaml")
                {
                    files.push(path.to_path_buf());
                }
            }
        }

        files
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;
    use crate::domain::project::Constraint;
    use anyhow::Result;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_discover_across_files() -> Result<()> {
        let dir = tempdir()?;
        write(
            dir.path(),
            "models/staging/channel.yml",
            "models:\n  - name: channel\n    columns:\n      - name: channel_id\n        tests: [not_null, unique]\n",
        );
        write(
            dir.path(),
            "models/marts/product.yaml",
            r#"
models:
  - name: product
    columns:
      - name: channel_id
        tests:
          - relationships:
              to: ref('channel')
              field: channel_id
"#,
        );
        write(dir.path(), "models/readme.md", "not a schema");

        let config = ProjectConfig::new("p");
        let registry = SchemaDiscovery.load(dir.path(), &config)?;

        assert_eq!(registry.len(), 2);
        let product = registry.get("product")?;
        assert_eq!(
            product.columns[0].constraints,
            vec![Constraint::Relationship {
                target_model: "channel".into(),
                target_field: "channel_id".into()
            }]
        );
        Ok(())
    }

    #[test]
    fn test_duplicate_model_across_files() {
        let dir = tempdir().unwrap();
        write(dir.path(), "models/a.yml", "models:\n  - name: m\n");
        write(dir.path(), "models/b.yml", "models:\n  - name: m\n");

        let result = SchemaDiscovery.load(dir.path(), &ProjectConfig::new("p"));
        assert!(matches!(
            result,
            Err(AssayError::Domain(DomainError::DuplicateModel(name))) if name == "m"
        ));
    }

    #[test]
    fn test_broken_yaml_names_the_file() {
        let dir = tempdir().unwrap();
        write(dir.path(), "models/broken.yml", "models: [\n");

        let result = SchemaDiscovery.load(dir.path(), &ProjectConfig::new("p"));
        match result {
            Err(AssayError::Infrastructure(InfrastructureError::YamlError { path, .. })) => {
                assert!(path.ends_with("broken.yml"));
            }
            other => panic!("expected a YAML error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_model_dir_gives_empty_registry() -> Result<()> {
        let dir = tempdir()?;
        let registry = SchemaDiscovery.load(dir.path(), &ProjectConfig::new("p"))?;
        assert!(registry.is_empty());
        Ok(())
    }
}

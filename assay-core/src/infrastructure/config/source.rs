// assay-core/src/infrastructure/config/source.rs

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::project::ProjectConfig;
use crate::infrastructure::error::InfrastructureError;

const SUPPORTED_EXTENSIONS: [&str; 1] = ["csv"];

/// CSV file backing each model.
///
/// An explicit `sources:` entry in the project file wins; otherwise the data
/// directory is scanned for `<model>.csv`. Models with neither are expected to
/// already exist as tables in the database.
pub fn resolve_csv_sources<'a>(
    project_dir: &Path,
    config: &ProjectConfig,
    models: impl IntoIterator<Item = &'a str>,
) -> Result<BTreeMap<String, PathBuf>, InfrastructureError> {
    let discovered = scan_data_dir(&project_dir.join(&config.data_path));
    let mut resolved = BTreeMap::new();

    for model in models {
        if let Some(explicit) = config.sources.get(model) {
            let raw_path = Path::new(explicit);
            let path = if raw_path.is_absolute() {
                raw_path.to_path_buf()
            } else {
                project_dir.join(raw_path)
            };
            if !path.exists() {
                return Err(InfrastructureError::ConfigError(format!(
                    "Source file for model '{}' not found at {:?}",
                    model, path
                )));
            }
            resolved.insert(model.to_string(), path);
        } else if let Some(path) = discovered.get(model) {
            resolved.insert(model.to_string(), path.clone());
        } else {
            debug!(model, "No CSV source, expecting a materialized table");
        }
    }

    for name in config.sources.keys() {
        if !resolved.contains_key(name) {
            warn!(source = %name, "Source declared for a model that is not in any schema");
        }
    }

    Ok(resolved)
}

fn scan_data_dir(data_dir: &Path) -> HashMap<String, PathBuf> {
    let mut found = HashMap::new();
    if !data_dir.exists() {
        return found;
    }

    let walker = WalkDir::new(data_dir)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()));

        if supported && let Some(stem) = path.file_stem() {
            let name = stem.to_string_lossy().to_string();
            if found.contains_key(&name) {
                warn!(model = %name, path = ?path, "Duplicate data file ignored");
                continue;
            }
            found.insert(name, path.to_path_buf());
        }
    }

    found
}

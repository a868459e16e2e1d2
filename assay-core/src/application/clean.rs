// assay-core/src/application/clean.rs

use crate::error::AssayError;
use crate::infrastructure::config::project::load_project_config;
use std::fs;
use std::path::{Component, Path};
use tracing::info;

/// Removes the configured clean targets; returns the ones that existed.
pub fn clean_project(project_dir: &Path) -> Result<Vec<String>, AssayError> {
    info!("Initializing cleanup sequence");

    let config = load_project_config(project_dir)?;

    let targets = if config.clean_targets.is_empty() {
        vec![config.target_path.clone()]
    } else {
        config.clean_targets
    };

    let mut removed = Vec::new();
    for target_rel_path in targets {
        // Zero-Trust Path Traversal Guard
        let relative = Path::new(&target_rel_path);
        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
        if escapes {
            return Err(AssayError::UnsafePath(target_rel_path));
        }

        let full_path = project_dir.join(relative);
        if full_path.exists() {
            if full_path.is_dir() {
                fs::remove_dir_all(&full_path)?;
            } else {
                fs::remove_file(&full_path)?;
            }
            info!(path = %target_rel_path, "Artifact removed");
            removed.push(target_rel_path);
        }
    }

    Ok(removed)
}

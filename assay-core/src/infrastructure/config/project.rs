// assay-core/src/infrastructure/config/project.rs

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::domain::project::configuration::ProjectConfig;
use crate::infrastructure::error::InfrastructureError;

const CONFIG_CANDIDATES: [&str; 2] = ["assay_project.yaml", "assay.yaml"];

#[instrument(skip(project_dir))]
pub fn load_project_config(project_dir: &Path) -> Result<ProjectConfig, InfrastructureError> {
    // 1. Découverte du fichier principal
    let config_path = find_main_config(project_dir)?;
    info!(path = ?config_path, "Loading project configuration");

    // 2. Chargement YAML Base
    let content = fs::read_to_string(&config_path)?;
    let mut config: ProjectConfig =
        serde_yaml::from_str(&content).map_err(|source| InfrastructureError::YamlError {
            path: config_path.display().to_string(),
            source,
        })?;

    // 3. Override via Variables d'Environnement (Pattern 'Layering')
    // Permet de faire: ASSAY_THREADS=1 assay run
    apply_env_overrides(&mut config);

    // 4. Garde-fous
    config
        .validate()
        .map_err(|e| InfrastructureError::ConfigError(format!("Invalid project config: {e}")))?;

    Ok(config)
}

fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    for filename in CONFIG_CANDIDATES {
        let p = root.join(filename);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(InfrastructureError::ConfigNotFound(format!(
        "No configuration file found in {:?}. Checked: {:?}",
        root, CONFIG_CANDIDATES
    )))
}

fn apply_env_overrides(config: &mut ProjectConfig) {
    if let Ok(val) = std::env::var("ASSAY_TARGET_PATH") {
        info!(old = ?config.target_path, new = ?val, "Overriding target path via ENV");
        config.target_path = val;
    }
    if let Ok(val) = std::env::var("ASSAY_PROFILE") {
        info!(old = ?config.profile, new = ?val, "Overriding profile via ENV");
        config.profile = val;
    }
    if let Ok(val) = std::env::var("ASSAY_DB_PATH") {
        info!(old = ?config.db_path, new = ?val, "Overriding database path via ENV");
        config.db_path = val;
    }
    if let Ok(val) = std::env::var("ASSAY_THREADS") {
        match val.parse::<usize>() {
            Ok(threads) => {
                info!(old = config.threads, new = threads, "Overriding threads via ENV");
                config.threads = threads;
            }
            Err(_) => warn!(value = %val, "Ignoring non-numeric ASSAY_THREADS"),
        }
    }
}

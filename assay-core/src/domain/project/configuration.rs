// src/domain/project/configuration.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct ProjectConfig {
    #[validate(length(min = 1, message = "Project name cannot be empty"))]
    pub name: String,
    pub version: String,
    #[serde(default = "default_profile")]
    pub profile: String,

    #[serde(rename = "model-paths", default = "default_model_paths")]
    pub model_paths: Vec<String>,

    #[serde(rename = "data-path", default = "default_data_path")]
    pub data_path: String,

    #[serde(rename = "target-path", default = "default_target_path")]
    pub target_path: String,

    #[serde(rename = "clean-targets", default = "default_clean_targets")]
    pub clean_targets: Vec<String>,

    /// DuckDB database holding already-materialized models.
    #[serde(rename = "db-path", default = "default_db_path")]
    pub db_path: String,

    /// Upper bound on models evaluated concurrently within a layer.
    #[validate(range(min = 1, max = 256))]
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Violating row ids kept per result.
    #[validate(range(min = 1))]
    #[serde(rename = "sample-size", default = "default_sample_size")]
    pub sample_size: usize,

    #[validate(range(min = 1))]
    #[serde(rename = "model-timeout-secs", default)]
    pub model_timeout_secs: Option<u64>,

    /// Model name -> CSV file, relative to the project directory.
    #[serde(default)]
    pub sources: HashMap<String, String>,
}

impl ProjectConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "1.0.0".to_string(),
            profile: default_profile(),
            model_paths: default_model_paths(),
            data_path: default_data_path(),
            target_path: default_target_path(),
            clean_targets: default_clean_targets(),
            db_path: default_db_path(),
            threads: default_threads(),
            sample_size: default_sample_size(),
            model_timeout_secs: None,
            sources: HashMap::new(),
        }
    }
}

fn default_model_paths() -> Vec<String> {
    vec!["models".to_string()]
}
fn default_data_path() -> String {
    "data".to_string()
}
fn default_clean_targets() -> Vec<String> {
    vec!["target".to_string()]
}
fn default_target_path() -> String {
    "target".to_string()
}
fn default_profile() -> String {
    "dev".to_string()
}
fn default_db_path() -> String {
    ":memory:".to_string()
}
fn default_threads() -> usize {
    4
}
fn default_sample_size() -> usize {
    10
}

// assay-core/src/application/mod.rs

pub mod clean;
pub mod pipeline;
pub mod validation;

// --- RE-EXPORTS (FACADE PATTERN) ---
// `use assay_core::application::{run_validation, clean_project};`

pub use clean::clean_project;
pub use pipeline::{RUN_RESULTS_FILE, register_sources, run_validation, save_report};
pub use validation::{ModelCheck, check_model, undocumented_columns};

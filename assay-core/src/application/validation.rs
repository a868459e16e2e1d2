// assay-core/src/application/validation.rs

use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

// Imports Hexagonaux
use crate::domain::project::Model;
use crate::domain::quality::{ConstraintEvaluator, MaterializedRows, Row, ValidationResult};

/// What one model contributes to the report.
#[derive(Debug, Clone)]
pub struct ModelCheck {
    pub results: Vec<ValidationResult>,
    pub undocumented_columns: Vec<String>,
}

pub fn check_model(
    model: &Model,
    rows: &[Row],
    upstream: &MaterializedRows,
    sample_size: usize,
) -> ModelCheck {
    // 1. Contrat de structure (non bloquant)
    let undocumented_columns = undocumented_columns(model, rows);

    // 2. Contraintes déclarées
    let results = ConstraintEvaluator::new(upstream)
        .with_sample_size(sample_size)
        .evaluate(model, rows);

    let failed = results.iter().filter(|r| !r.passed).count();
    debug!(
        model = %model.name,
        rows = rows.len(),
        checks = results.len(),
        failed,
        "Model evaluated"
    );

    ModelCheck {
        results,
        undocumented_columns,
    }
}

/// Columns present in the data but missing from the schema, sorted.
/// Compared case-insensitively; reported with the data's spelling.
pub fn undocumented_columns(model: &Model, rows: &[Row]) -> Vec<String> {
    let expected: HashSet<String> = model
        .columns
        .iter()
        .map(|c| c.name.to_lowercase())
        .collect();

    let undocumented: BTreeSet<&String> = rows
        .iter()
        .flat_map(|row| row.keys())
        .filter(|name| !expected.contains(&name.to_lowercase()))
        .collect();

    let undocumented: Vec<String> = undocumented.into_iter().cloned().collect();
    if !undocumented.is_empty() {
        // On prévient sans bloquer : la doc est en retard sur les données
        warn!(
            model = %model.name,
            columns = ?undocumented,
            "Undocumented columns detected"
        );
    }
    undocumented
}

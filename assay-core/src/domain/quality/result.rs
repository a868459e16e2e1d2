// assay-core/src/domain/quality/result.rs

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::project::Constraint;

/// Problems that prevent a constraint from being judged on data alone.
/// They fail the result that carries them but never abort the run.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EvaluationError {
    #[error("type mismatch at row {row}: expected a number, found {found}")]
    TypeMismatch { row: usize, found: String },

    #[error("evaluation exceeded the {secs}s deadline")]
    Timeout { secs: u64 },

    #[error("rows of upstream model '{model}' are not available")]
    MissingUpstream { model: String },

    #[error("could not fetch rows: {message}")]
    Source { message: String },
}

/// Outcome of one constraint on one column of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub model: String,
    pub column: String,
    pub constraint: Constraint,
    pub passed: bool,
    pub violations: usize,
    /// Positions of the first violating rows.
    pub samples: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EvaluationError>,
}

impl ValidationResult {
    pub(crate) fn from_violations(
        model: &str,
        column: &str,
        constraint: &Constraint,
        violating_rows: impl IntoIterator<Item = usize>,
        sample_size: usize,
    ) -> Self {
        let mut violations = 0;
        let mut samples = Vec::new();
        for row in violating_rows {
            if samples.len() < sample_size {
                samples.push(row);
            }
            violations += 1;
        }

        Self {
            model: model.to_string(),
            column: column.to_string(),
            constraint: constraint.clone(),
            passed: violations == 0,
            violations,
            samples,
            error: None,
        }
    }

    pub(crate) fn errored(
        model: &str,
        column: &str,
        constraint: &Constraint,
        error: EvaluationError,
    ) -> Self {
        Self {
            model: model.to_string(),
            column: column.to_string(),
            constraint: constraint.clone(),
            passed: false,
            violations: 0,
            samples: Vec::new(),
            error: Some(error),
        }
    }

    pub(crate) fn with_error(mut self, error: EvaluationError) -> Self {
        self.passed = false;
        self.error = Some(error);
        self
    }
}

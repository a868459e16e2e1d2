// assay-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

/// Configuration-level errors. Any of these aborts the run before evaluation.
#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Model '{0}' is defined more than once")]
    #[diagnostic(
        code(assay::domain::duplicate_model),
        help("Model names must be unique across every schema file.")
    )]
    DuplicateModel(String),

    #[error("Model '{0}' not found in registry")]
    #[diagnostic(code(assay::domain::unknown_model))]
    UnknownModel(String),

    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    #[diagnostic(
        code(assay::domain::cycle),
        help("Check the `relationships` tests and their ref() targets.")
    )]
    CyclicDependency(Vec<String>),

    #[error("Model '{model}' references unknown model '{target}'")]
    #[diagnostic(
        code(assay::domain::dangling_reference),
        help("Declare '{target}' in a schema file or fix the ref() target.")
    )]
    DanglingReference { model: String, target: String },

    #[error("Type mismatch on {model}.{column}: {detail}")]
    #[diagnostic(code(assay::domain::type_mismatch))]
    TypeMismatch {
        model: String,
        column: String,
        detail: String,
    },

    #[error("Schema Error: {0}")]
    #[diagnostic(code(assay::domain::schema))]
    SchemaError(String),
}

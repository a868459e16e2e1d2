// assay-core/src/domain/quality/mod.rs

pub mod evaluator;
pub mod report;
pub mod result;
pub mod value;

pub use evaluator::{ConstraintEvaluator, DEFAULT_SAMPLE_SIZE, MaterializedRows};
pub use report::{
    ColumnReport, ConstraintViolation, ModelReport, Report, ReportAggregator, aggregate,
};
pub use result::{EvaluationError, ValidationResult};
pub use value::{Row, Value, ValueKey, row};

// assay-core/src/domain/quality/evaluator.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::project::{Column, Constraint, Model};
use crate::domain::quality::result::{EvaluationError, ValidationResult};
use crate::domain::quality::value::{Row, Value, ValueKey};

pub const DEFAULT_SAMPLE_SIZE: usize = 10;

/// Rows of the models already evaluated in this run, shared read-only.
pub type MaterializedRows = HashMap<String, Arc<Vec<Row>>>;

static NULL: Value = Value::Null;

fn cell<'r>(row: &'r Row, column: &str) -> &'r Value {
    row.get(column).unwrap_or(&NULL)
}

/// Checks declared constraints against materialized rows.
///
/// Relationship checks read the target model's rows from `upstream`, so the
/// caller must evaluate models in resolution order.
pub struct ConstraintEvaluator<'a> {
    upstream: &'a MaterializedRows,
    sample_size: usize,
}

impl<'a> ConstraintEvaluator<'a> {
    pub fn new(upstream: &'a MaterializedRows) -> Self {
        Self {
            upstream,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// One result per (column, constraint), in declaration order.
    pub fn evaluate(&self, model: &Model, rows: &[Row]) -> Vec<ValidationResult> {
        let mut results = Vec::with_capacity(model.constraint_count());
        for column in &model.columns {
            for constraint in &column.constraints {
                results.push(self.evaluate_constraint(model, column, constraint, rows));
            }
        }
        results
    }

    fn evaluate_constraint(
        &self,
        model: &Model,
        column: &Column,
        constraint: &Constraint,
        rows: &[Row],
    ) -> ValidationResult {
        let col = column.name.as_str();
        let build = |violating: Vec<usize>| {
            ValidationResult::from_violations(
                &model.name,
                col,
                constraint,
                violating,
                self.sample_size,
            )
        };

        match constraint {
            Constraint::NotNull => build(
                rows.iter()
                    .enumerate()
                    .filter(|(_, row)| cell(row, col).is_null())
                    .map(|(i, _)| i)
                    .collect(),
            ),

            Constraint::Unique => build(duplicated_rows(rows, col)),

            Constraint::AcceptedRange {
                min,
                max,
                inclusive,
            } => {
                let (violating, mismatch) = out_of_range_rows(rows, col, *min, *max, *inclusive);
                let result = build(violating);
                match mismatch {
                    Some(error) => result.with_error(error),
                    None => result,
                }
            }

            Constraint::Relationship {
                target_model,
                target_field,
            } => {
                let target_rows: &[Row] = if *target_model == model.name {
                    rows
                } else {
                    match self.upstream.get(target_model) {
                        Some(materialized) => materialized.as_slice(),
                        None => {
                            return ValidationResult::errored(
                                &model.name,
                                col,
                                constraint,
                                EvaluationError::MissingUpstream {
                                    model: target_model.clone(),
                                },
                            );
                        }
                    }
                };
                build(orphan_rows(rows, col, target_rows, target_field))
            }
        }
    }
}

/// Every row whose non-null value appears more than once. NULLs and NaNs never collide.
fn duplicated_rows(rows: &[Row], column: &str) -> Vec<usize> {
    let mut groups: HashMap<ValueKey, Vec<usize>> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        if let Some(key) = cell(row, column).key() {
            groups.entry(key).or_default().push(i);
        }
    }

    let mut violating: Vec<usize> = groups
        .into_values()
        .filter(|positions| positions.len() > 1)
        .flatten()
        .collect();
    violating.sort_unstable();
    violating
}

/// Rows outside `[min, max]` (or `(min, max)`), plus the first non-numeric value if any.
/// Non-numeric rows count as violations. NaN fails every bound.
fn out_of_range_rows(
    rows: &[Row],
    column: &str,
    min: f64,
    max: Option<f64>,
    inclusive: bool,
) -> (Vec<usize>, Option<EvaluationError>) {
    let within = |x: f64| {
        if inclusive {
            x >= min && max.is_none_or(|m| x <= m)
        } else {
            x > min && max.is_none_or(|m| x < m)
        }
    };

    let mut violating = Vec::new();
    let mut mismatch = None;

    for (i, row) in rows.iter().enumerate() {
        let value = cell(row, column);
        if value.is_null() {
            continue;
        }
        match value.as_f64() {
            Some(x) if within(x) => {}
            Some(_) => violating.push(i),
            None => {
                mismatch.get_or_insert_with(|| EvaluationError::TypeMismatch {
                    row: i,
                    found: value.type_name().to_string(),
                });
                violating.push(i);
            }
        }
    }

    (violating, mismatch)
}

/// Rows whose non-null value is missing from `target_field` in the target rows.
/// A NaN matches nothing, so it is always an orphan.
fn orphan_rows(rows: &[Row], column: &str, target_rows: &[Row], target_field: &str) -> Vec<usize> {
    let known: HashSet<ValueKey> = target_rows
        .iter()
        .filter_map(|row| cell(row, target_field).key())
        .collect();

    rows.iter()
        .enumerate()
        .filter(|(_, row)| {
            let value = cell(row, column);
            match value.key() {
                Some(key) => !known.contains(&key),
                None => !value.is_null(),
            }
        })
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::quality::value::row;

    fn single_column_model(name: &str, column: &str, constraint: Constraint) -> Model {
        Model::new(name).with_column(Column::new(column).with(constraint))
    }

    fn rows_of(column: &str, values: Vec<Value>) -> Vec<Row> {
        values.into_iter().map(|v| row([(column, v)])).collect()
    }

    fn evaluate_one(model: &Model, rows: &[Row]) -> ValidationResult {
        let upstream = MaterializedRows::new();
        let mut results = ConstraintEvaluator::new(&upstream).evaluate(model, rows);
        assert_eq!(results.len(), 1);
        results.remove(0)
    }

    #[test]
    fn test_not_null() {
        let model = single_column_model("m", "x", Constraint::NotNull);
        let rows = rows_of("x", vec![Value::Int(1), Value::Null, Value::Int(3)]);

        let result = evaluate_one(&model, &rows);
        assert!(!result.passed);
        assert_eq!(result.violations, 1);
        assert_eq!(result.samples, vec![1]);
    }

    #[test]
    fn test_not_null_absent_column_counts_as_null() {
        let model = single_column_model("m", "x", Constraint::NotNull);
        let rows = vec![row([("x", 1_i64)]), row([("y", 2_i64)])];

        let result = evaluate_one(&model, &rows);
        assert_eq!(result.violations, 1);
        assert_eq!(result.samples, vec![1]);
    }

    #[test]
    fn test_unique_counts_every_duplicated_row() {
        let model = single_column_model("m", "x", Constraint::Unique);
        let rows = rows_of(
            "x",
            vec![Value::Int(1), Value::Int(2), Value::Int(2), Value::Int(3)],
        );

        let result = evaluate_one(&model, &rows);
        assert_eq!(result.violations, 2);
        assert_eq!(result.samples, vec![1, 2]);
    }

    #[test]
    fn test_unique_exempts_nulls() {
        let model = single_column_model("m", "x", Constraint::Unique);
        let rows = rows_of("x", vec![Value::Null, Value::Null, Value::Int(1)]);

        assert!(evaluate_one(&model, &rows).passed);
    }

    #[test]
    fn test_unique_int_and_integral_float_collide() {
        let model = single_column_model("m", "x", Constraint::Unique);
        let rows = rows_of("x", vec![Value::Int(7), Value::Float(7.0)]);

        assert_eq!(evaluate_one(&model, &rows).violations, 2);
    }

    #[test]
    fn test_accepted_range_min_only() {
        let model = single_column_model(
            "m",
            "x",
            Constraint::AcceptedRange {
                min: 0.0,
                max: None,
                inclusive: true,
            },
        );
        let rows = rows_of("x", vec![Value::Int(-5), Value::Int(0), Value::Int(10)]);

        let result = evaluate_one(&model, &rows);
        assert_eq!(result.violations, 1);
        assert_eq!(result.samples, vec![0]);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_accepted_range_exclusive_bounds() {
        let model = single_column_model(
            "m",
            "x",
            Constraint::AcceptedRange {
                min: 0.0,
                max: Some(10.0),
                inclusive: false,
            },
        );
        let rows = rows_of(
            "x",
            vec![
                Value::Int(0),
                Value::Float(5.5),
                Value::Int(10),
                Value::Null,
            ],
        );

        let result = evaluate_one(&model, &rows);
        assert_eq!(result.violations, 2);
        assert_eq!(result.samples, vec![0, 2]);
    }

    #[test]
    fn test_accepted_range_type_mismatch_is_reported() {
        let model = single_column_model(
            "m",
            "price",
            Constraint::AcceptedRange {
                min: 0.0,
                max: None,
                inclusive: true,
            },
        );
        let rows = rows_of(
            "price",
            vec![Value::Int(3), Value::Text("cheap".into()), Value::Int(-1)],
        );

        let result = evaluate_one(&model, &rows);
        assert!(!result.passed);
        assert_eq!(result.violations, 2);
        assert_eq!(
            result.error,
            Some(EvaluationError::TypeMismatch {
                row: 1,
                found: "text".into()
            })
        );
    }

    #[test]
    fn test_relationship_against_upstream() {
        let model = single_column_model(
            "product",
            "channel_id",
            Constraint::Relationship {
                target_model: "channel".into(),
                target_field: "channel_id".into(),
            },
        );

        let mut upstream = MaterializedRows::new();
        upstream.insert(
            "channel".into(),
            Arc::new(rows_of(
                "channel_id",
                vec![Value::Int(1), Value::Int(2), Value::Int(3)],
            )),
        );

        let rows = rows_of(
            "channel_id",
            vec![Value::Int(1), Value::Int(2), Value::Int(99), Value::Null],
        );
        let results = ConstraintEvaluator::new(&upstream).evaluate(&model, &rows);

        assert_eq!(results[0].violations, 1);
        assert_eq!(results[0].samples, vec![2]);
    }

    #[test]
    fn test_nan_never_duplicates_but_is_an_orphan() {
        let unique = single_column_model("m", "x", Constraint::Unique);
        let nans = rows_of("x", vec![Value::Float(f64::NAN), Value::Float(f64::NAN)]);
        assert!(evaluate_one(&unique, &nans).passed);

        let rel = single_column_model(
            "m",
            "x",
            Constraint::Relationship {
                target_model: "t".into(),
                target_field: "x".into(),
            },
        );
        let mut upstream = MaterializedRows::new();
        upstream.insert(
            "t".into(),
            Arc::new(rows_of("x", vec![Value::Float(f64::NAN), Value::Int(1)])),
        );
        let rows = rows_of("x", vec![Value::Int(1), Value::Float(f64::NAN)]);
        let results = ConstraintEvaluator::new(&upstream).evaluate(&rel, &rows);

        assert_eq!(results[0].violations, 1);
        assert_eq!(results[0].samples, vec![1]);
    }

    #[test]
    fn test_relationship_missing_upstream() {
        let model = single_column_model(
            "product",
            "channel_id",
            Constraint::Relationship {
                target_model: "channel".into(),
                target_field: "channel_id".into(),
            },
        );

        let result = evaluate_one(&model, &rows_of("channel_id", vec![Value::Int(1)]));
        assert!(!result.passed);
        assert!(matches!(
            result.error,
            Some(EvaluationError::MissingUpstream { ref model }) if model == "channel"
        ));
    }

    #[test]
    fn test_relationship_self_reference_uses_own_rows() {
        let model = Model::new("category")
            .with_column(Column::new("id"))
            .with_column(Column::new("parent_id").with(Constraint::Relationship {
                target_model: "category".into(),
                target_field: "id".into(),
            }));
        let rows = vec![
            row([("id", Value::Int(1)), ("parent_id", Value::Null)]),
            row([("id", Value::Int(2)), ("parent_id", Value::Int(1))]),
            row([("id", Value::Int(3)), ("parent_id", Value::Int(42))]),
        ];

        let result = evaluate_one(&model, &rows);
        assert_eq!(result.violations, 1);
        assert_eq!(result.samples, vec![2]);
    }

    #[test]
    fn test_samples_are_bounded() {
        let model = single_column_model("m", "x", Constraint::NotNull);
        let rows = rows_of("x", vec![Value::Null; 25]);

        let upstream = MaterializedRows::new();
        let results = ConstraintEvaluator::new(&upstream)
            .with_sample_size(3)
            .evaluate(&model, &rows);

        assert_eq!(results[0].violations, 25);
        assert_eq!(results[0].samples, vec![0, 1, 2]);
    }

    #[test]
    fn test_results_follow_declaration_order() {
        let model = Model::new("m")
            .with_column(
                Column::new("b")
                    .with(Constraint::Unique)
                    .with(Constraint::NotNull),
            )
            .with_column(Column::new("a").with(Constraint::NotNull));

        let upstream = MaterializedRows::new();
        let results = ConstraintEvaluator::new(&upstream).evaluate(&model, &[]);

        let seen: Vec<(&str, &str)> = results
            .iter()
            .map(|r| (r.column.as_str(), r.constraint.kind()))
            .collect();
        assert_eq!(
            seen,
            vec![("b", "unique"), ("b", "not_null"), ("a", "not_null")]
        );
    }

    #[test]
    fn test_empty_rows_pass_everything() {
        let model = Model::new("m").with_column(
            Column::new("x")
                .with(Constraint::NotNull)
                .with(Constraint::Unique)
                .with(Constraint::AcceptedRange {
                    min: 0.0,
                    max: Some(1.0),
                    inclusive: true,
                })
                .with(Constraint::Relationship {
                    target_model: "m".into(),
                    target_field: "x".into(),
                }),
        );

        let upstream = MaterializedRows::new();
        let results = ConstraintEvaluator::new(&upstream).evaluate(&model, &[]);
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.passed && r.violations == 0));
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let model = Model::new("m").with_column(
            Column::new("x")
                .with(Constraint::Unique)
                .with(Constraint::NotNull),
        );
        let rows = rows_of(
            "x",
            vec![
                Value::Int(5),
                Value::Int(5),
                Value::Null,
                Value::Text("a".into()),
                Value::Text("a".into()),
            ],
        );

        let upstream = MaterializedRows::new();
        let evaluator = ConstraintEvaluator::new(&upstream);
        assert_eq!(
            evaluator.evaluate(&model, &rows),
            evaluator.evaluate(&model, &rows)
        );
    }
}

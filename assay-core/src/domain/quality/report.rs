// assay-core/src/domain/quality/report.rs
//
// Folds per-model results into one pass/fail verdict.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::quality::result::ValidationResult;

// ── Report Structures ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub passed: bool,
    pub total_violations: usize,
    pub total_checks: usize,
    pub failed_checks: usize,
    pub generated_at: String,
    /// Models in resolution order.
    pub models: Vec<ModelReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelReport {
    pub name: String,
    pub passed: bool,
    pub violations: usize,
    /// Columns found in the data but absent from the schema.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub undocumented_columns: Vec<String>,
    /// Columns in declaration order.
    pub columns: Vec<ColumnReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnReport {
    pub name: String,
    /// Constraints in declaration order.
    pub results: Vec<ValidationResult>,
}

/// A failed check, detached from the report for callers that gate on failures.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
#[error("{kind} failed on {model}.{column}: {violations} violation(s), sample rows {samples:?}")]
#[diagnostic(code(assay::quality::violation))]
pub struct ConstraintViolation {
    pub kind: &'static str,
    pub model: String,
    pub column: String,
    pub violations: usize,
    pub samples: Vec<usize>,
}

impl Report {
    pub fn model(&self, name: &str) -> Option<&ModelReport> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn results(&self) -> impl Iterator<Item = &ValidationResult> {
        self.models
            .iter()
            .flat_map(|m| m.columns.iter())
            .flat_map(|c| c.results.iter())
    }

    pub fn violations(&self) -> impl Iterator<Item = ConstraintViolation> + '_ {
        self.results()
            .filter(|r| !r.passed)
            .map(|r| ConstraintViolation {
                kind: r.constraint.kind(),
                model: r.model.clone(),
                column: r.column.clone(),
                violations: r.violations,
                samples: r.samples.clone(),
            })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deterministic text rendering: models in resolution order, then columns
    /// and constraints in declaration order. The timestamp is left out.
    pub fn format(&self) -> String {
        let mut lines = Vec::new();

        for model in &self.models {
            lines.push(format!("{} {}", badge(model.passed), model.name));
            for column in &model.columns {
                lines.push(format!("  {}", column.name));
                for result in &column.results {
                    lines.push(format!("    {}", describe(result)));
                }
            }
            if !model.undocumented_columns.is_empty() {
                lines.push(format!(
                    "  undocumented columns: {}",
                    model.undocumented_columns.join(", ")
                ));
            }
        }

        if self.passed {
            lines.push(format!(
                "PASS: {} checks passed across {} model(s)",
                self.total_checks,
                self.models.len()
            ));
        } else {
            lines.push(format!(
                "FAIL: {} of {} checks failed, {} violation(s) across {} model(s)",
                self.failed_checks,
                self.total_checks,
                self.total_violations,
                self.models.len()
            ));
        }

        lines.join("\n")
    }
}

fn badge(passed: bool) -> &'static str {
    if passed { "[PASS]" } else { "[FAIL]" }
}

fn describe(result: &ValidationResult) -> String {
    let mut line = format!("{} {}", badge(result.passed), result.constraint);
    if result.violations > 0 {
        line.push_str(&format!(
            ": {} violation(s), sample rows {:?}",
            result.violations, result.samples
        ));
    }
    if let Some(error) = &result.error {
        line.push_str(&format!(" ({error})"));
    }
    line
}

// ── Aggregator ───────────────────────────────────────────────────────

/// Collects results model by model, then orders them into a [`Report`].
#[derive(Debug, Default)]
pub struct ReportAggregator {
    results: HashMap<String, Vec<ValidationResult>>,
    undocumented: HashMap<String, Vec<String>>,
}

impl ReportAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, model: &str, results: Vec<ValidationResult>) {
        self.results.entry(model.to_string()).or_default().extend(results);
    }

    pub fn record_undocumented(&mut self, model: &str, columns: Vec<String>) {
        if !columns.is_empty() {
            self.undocumented.insert(model.to_string(), columns);
        }
    }

    /// `order` is the resolution order; models missing from it go last, by name.
    pub fn finish(mut self, order: &[String]) -> Report {
        let mut names: Vec<String> = order
            .iter()
            .filter(|name| self.results.contains_key(*name))
            .cloned()
            .collect();
        let mut extra: Vec<String> = self
            .results
            .keys()
            .filter(|name| !order.contains(name))
            .cloned()
            .collect();
        extra.sort();
        names.extend(extra);

        let mut models = Vec::with_capacity(names.len());
        for name in names {
            let results = self.results.remove(&name).unwrap_or_default();
            let undocumented_columns = self.undocumented.remove(&name).unwrap_or_default();
            models.push(model_report(name, results, undocumented_columns));
        }

        let total_checks = models
            .iter()
            .flat_map(|m| m.columns.iter())
            .map(|c| c.results.len())
            .sum();
        let failed_checks = models
            .iter()
            .flat_map(|m| m.columns.iter())
            .flat_map(|c| c.results.iter())
            .filter(|r| !r.passed)
            .count();

        Report {
            passed: models.iter().all(|m| m.passed),
            total_violations: models.iter().map(|m| m.violations).sum(),
            total_checks,
            failed_checks,
            generated_at: chrono::Utc::now().to_rfc3339(),
            models,
        }
    }
}

/// One-shot form of [`ReportAggregator`].
pub fn aggregate(
    order: &[String],
    results_by_model: HashMap<String, Vec<ValidationResult>>,
) -> Report {
    let mut aggregator = ReportAggregator::new();
    for (model, results) in results_by_model {
        aggregator.record(&model, results);
    }
    aggregator.finish(order)
}

fn model_report(
    name: String,
    results: Vec<ValidationResult>,
    undocumented_columns: Vec<String>,
) -> ModelReport {
    let passed = results.iter().all(|r| r.passed);
    let violations = results.iter().map(|r| r.violations).sum();

    // Results arrive in declaration order; group by column keeping first appearance.
    let mut columns: Vec<ColumnReport> = Vec::new();
    for result in results {
        match columns.iter_mut().find(|c| c.name == result.column) {
            Some(column) => column.results.push(result),
            None => columns.push(ColumnReport {
                name: result.column.clone(),
                results: vec![result],
            }),
        }
    }

    ModelReport {
        name,
        passed,
        violations,
        undocumented_columns,
        columns,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::project::Constraint;

    fn result(
        model: &str,
        column: &str,
        constraint: Constraint,
        samples: Vec<usize>,
    ) -> ValidationResult {
        ValidationResult::from_violations(model, column, &constraint, samples, 10)
    }

    fn sample_results() -> HashMap<String, Vec<ValidationResult>> {
        let mut map = HashMap::new();
        map.insert(
            "product".to_string(),
            vec![
                result("product", "product_id", Constraint::NotNull, vec![]),
                result(
                    "product",
                    "price",
                    Constraint::AcceptedRange {
                        min: 0.0,
                        max: None,
                        inclusive: true,
                    },
                    vec![0],
                ),
                result(
                    "product",
                    "channel_id",
                    Constraint::Relationship {
                        target_model: "channel".into(),
                        target_field: "channel_id".into(),
                    },
                    vec![2],
                ),
            ],
        );
        map.insert(
            "channel".to_string(),
            vec![
                result("channel", "channel_id", Constraint::NotNull, vec![]),
                result("channel", "channel_id", Constraint::Unique, vec![]),
            ],
        );
        map
    }

    #[test]
    fn test_aggregate_totals() {
        let order = vec!["channel".to_string(), "product".to_string()];
        let report = aggregate(&order, sample_results());

        assert!(!report.passed);
        assert_eq!(report.total_violations, 2);
        assert_eq!(report.total_checks, 5);
        assert_eq!(report.failed_checks, 2);
        assert!(report.model("channel").unwrap().passed);
        assert!(!report.model("product").unwrap().passed);
        assert_eq!(report.model("product").unwrap().columns.len(), 3);
    }

    #[test]
    fn test_aggregate_follows_resolution_order() {
        let order = vec!["product".to_string(), "channel".to_string()];
        let report = aggregate(&order, sample_results());

        let names: Vec<&str> = report.models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["product", "channel"]);
    }

    #[test]
    fn test_violations_iterator() {
        let order = vec!["channel".to_string(), "product".to_string()];
        let report = aggregate(&order, sample_results());

        let violations: Vec<ConstraintViolation> = report.violations().collect();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].kind, "accepted_range");
        assert_eq!(violations[1].kind, "relationships");
        assert_eq!(violations[1].column, "channel_id");
    }

    #[test]
    fn test_empty_report_passes() {
        let report = aggregate(&[], HashMap::new());
        assert!(report.passed);
        assert_eq!(report.format(), "PASS: 0 checks passed across 0 model(s)");
    }

    #[test]
    fn test_format_is_deterministic() {
        let order = vec!["channel".to_string(), "product".to_string()];
        let report = aggregate(&order, sample_results());

        insta::assert_snapshot!(report.format(), @r"
[PASS] channel
  channel_id
    [PASS] not_null
    [PASS] unique
[FAIL] product
  product_id
    [PASS] not_null
  price
    [FAIL] accepted_range [0, +inf): 1 violation(s), sample rows [0]
  channel_id
    [FAIL] relationships -> channel.channel_id: 1 violation(s), sample rows [2]
FAIL: 2 of 5 checks failed, 2 violation(s) across 2 model(s)
");
        assert_eq!(report.format(), aggregate(&order, sample_results()).format());
    }

    #[test]
    fn test_json_export_round_trips() {
        let order = vec!["channel".to_string(), "product".to_string()];
        let report = aggregate(&order, sample_results());

        let json = report.to_json().unwrap();
        let back: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(back.models.len(), 2);
        assert_eq!(back.total_violations, 2);
    }
}

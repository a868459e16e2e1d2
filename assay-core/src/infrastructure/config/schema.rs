// src/infrastructure/config/schema.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::warn;

use crate::domain::error::DomainError;
use crate::domain::project::{Column, Constraint, MaterializationType, Model};

fn re_ref() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*ref\s*\(\s*['"]([^'"]+)['"]\s*\)\s*$"#).unwrap_or_else(|_| {
            // Hardcoded pattern; the fallback only keeps clippy's unwrap guard quiet.
            Regex::new("$^").unwrap_or_else(|_| unreachable!())
        })
    })
}

// =============================================================================
//  1. DATA CONTRACT (dbt-compatible schema file)
// =============================================================================

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SchemaFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<serde_yaml::Value>,

    #[serde(default)]
    pub models: Vec<ModelSchema>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelSchema {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub config: ModelConfig,

    #[serde(default)]
    pub columns: Vec<ColumnSchema>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ModelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materialized: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ColumnSchema {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, alias = "data_tests")]
    pub tests: Vec<TestSpec>,
}

/// `- not_null` or `- relationships: { to: ref('x'), field: id }`.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub enum TestSpec {
    Name(String),
    Configured(BTreeMap<String, Option<TestArgs>>),
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TestArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

// =============================================================================
//  2. CONVERSION VERS LE DOMAINE
// =============================================================================

impl ModelSchema {
    pub fn into_model(self) -> Result<Model, DomainError> {
        let materialized = match self.config.materialized.as_deref() {
            None => None,
            Some(raw) => {
                let parsed = MaterializationType::parse(raw);
                if parsed.is_none() {
                    warn!(
                        model = %self.name,
                        materialized = %raw,
                        "Unknown materialization, ignoring"
                    );
                }
                parsed
            }
        };

        let mut columns = Vec::with_capacity(self.columns.len());
        for col in self.columns {
            let mut constraints = Vec::with_capacity(col.tests.len());
            for test in &col.tests {
                if let Some(constraint) = test_to_constraint(&self.name, &col.name, test)? {
                    constraints.push(constraint);
                }
            }
            columns.push(Column {
                name: col.name,
                description: col.description.unwrap_or_default(),
                constraints,
            });
        }

        Ok(Model {
            name: self.name,
            description: self.description,
            materialized,
            columns,
        })
    }
}

/// `None` for test kinds the engine does not evaluate (skipped with a warning).
fn test_to_constraint(
    model: &str,
    column: &str,
    test: &TestSpec,
) -> Result<Option<Constraint>, DomainError> {
    let default_args = TestArgs::default();
    let (name, args) = match test {
        TestSpec::Name(name) => (name.as_str(), &default_args),
        TestSpec::Configured(map) => {
            let mut entries = map.iter();
            match (entries.next(), entries.next()) {
                (Some((name, args)), None) => {
                    (name.as_str(), args.as_ref().unwrap_or(&default_args))
                }
                _ => {
                    return Err(DomainError::SchemaError(format!(
                        "Test on {model}.{column} must name exactly one test kind"
                    )));
                }
            }
        }
    };

    // `dbt_utils.accepted_range` and friends
    let kind = name.rsplit('.').next().unwrap_or(name);

    let constraint = match kind {
        "not_null" => Constraint::NotNull,
        "unique" => Constraint::Unique,
        "accepted_range" => accepted_range(model, column, args)?,
        "relationships" => relationship(model, column, args)?,
        other => {
            warn!(model, column, test = other, "Unknown test type (skipping)");
            return Ok(None);
        }
    };

    Ok(Some(constraint))
}

fn accepted_range(model: &str, column: &str, args: &TestArgs) -> Result<Constraint, DomainError> {
    let min = numeric_bound(model, column, "min_value", args.min_value.as_ref())?;
    let max = numeric_bound(model, column, "max_value", args.max_value.as_ref())?;

    let Some(min) = min else {
        return Err(DomainError::SchemaError(format!(
            "accepted_range on {model}.{column} needs a min_value"
        )));
    };
    if let Some(max) = max
        && min > max
    {
        return Err(DomainError::SchemaError(format!(
            "accepted_range on {model}.{column}: min_value {min} is greater than max_value {max}"
        )));
    }

    Ok(Constraint::AcceptedRange {
        min,
        max,
        inclusive: args.inclusive.unwrap_or(true),
    })
}

fn numeric_bound(
    model: &str,
    column: &str,
    key: &str,
    raw: Option<&serde_yaml::Value>,
) -> Result<Option<f64>, DomainError> {
    match raw {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::Number(n)) => n.as_f64().map(Some).ok_or_else(|| {
            DomainError::TypeMismatch {
                model: model.to_string(),
                column: column.to_string(),
                detail: format!("{key} is not representable as a number"),
            }
        }),
        Some(other) => Err(DomainError::TypeMismatch {
            model: model.to_string(),
            column: column.to_string(),
            detail: format!("{key} must be numeric, got {other:?}"),
        }),
    }
}

fn relationship(model: &str, column: &str, args: &TestArgs) -> Result<Constraint, DomainError> {
    let (Some(to), Some(field)) = (args.to.as_deref(), args.field.as_deref()) else {
        return Err(DomainError::SchemaError(format!(
            "relationships on {model}.{column} needs both 'to' and 'field'"
        )));
    };

    Ok(Constraint::Relationship {
        target_model: parse_ref(to),
        target_field: field.to_string(),
    })
}

/// `ref('transformed_channel')` -> `transformed_channel`; bare names pass through.
pub fn parse_ref(raw: &str) -> String {
    match re_ref().captures(raw) {
        Some(cap) => cap[1].to_string(),
        None => raw.trim().to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
version: 2

models:
  - name: transformed_channel
    description: "Telegram channels"
    config:
      materialized: table
    columns:
      - name: channel_id
        description: "Primary key"
        tests:
          - not_null
          - unique

  - name: transformed_product
    columns:
      - name: product_id
        data_tests:
          - unique
      - name: price
        tests:
          - dbt_utils.accepted_range:
              min_value: 0
              max_value: 100000
      - name: channel_id
        tests:
          - relationships:
              to: ref('transformed_channel')
              field: channel_id
      - name: label
        tests:
          - accepted_values:
              values: ['a', 'b']
"#;

    fn load(yaml: &str) -> Result<Vec<Model>, DomainError> {
        let file: SchemaFile = serde_yaml::from_str(yaml).unwrap();
        file.models.into_iter().map(ModelSchema::into_model).collect()
    }

    #[test]
    fn test_parse_dbt_schema() {
        let models = load(SCHEMA).unwrap();
        assert_eq!(models.len(), 2);

        let channel = &models[0];
        assert_eq!(channel.materialized, Some(MaterializationType::Table));
        assert_eq!(channel.columns[0].description, "Primary key");
        assert_eq!(
            channel.columns[0].constraints,
            vec![Constraint::NotNull, Constraint::Unique]
        );

        let product = &models[1];
        assert_eq!(product.columns[0].constraints, vec![Constraint::Unique]);
        assert_eq!(
            product.columns[1].constraints,
            vec![Constraint::AcceptedRange {
                min: 0.0,
                max: Some(100000.0),
                inclusive: true
            }]
        );
        assert_eq!(
            product.columns[2].constraints,
            vec![Constraint::Relationship {
                target_model: "transformed_channel".into(),
                target_field: "channel_id".into()
            }]
        );
        // accepted_values is not evaluated by this engine
        assert!(product.columns[3].constraints.is_empty());
    }

    #[test]
    fn test_parse_ref_forms() {
        assert_eq!(parse_ref("ref('a')"), "a");
        assert_eq!(parse_ref("ref( \"b\" )"), "b");
        assert_eq!(parse_ref(" c "), "c");
    }

    #[test]
    fn test_non_numeric_bound_is_fatal_type_mismatch() {
        let yaml = r#"
models:
  - name: m
    columns:
      - name: x
        tests:
          - accepted_range:
              min_value: "zero"
"#;
        assert!(matches!(load(yaml), Err(DomainError::TypeMismatch { .. })));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let yaml = r#"
models:
  - name: m
    columns:
      - name: x
        tests:
          - accepted_range: { min_value: 10, max_value: 1 }
"#;
        assert!(matches!(load(yaml), Err(DomainError::SchemaError(_))));
    }

    #[test]
    fn test_exclusive_range_and_missing_min() {
        let yaml = r#"
models:
  - name: m
    columns:
      - name: x
        tests:
          - accepted_range: { min_value: 0.5, max_value: 5, inclusive: false }
"#;
        let models = load(yaml).unwrap();
        assert_eq!(
            models[0].columns[0].constraints[0],
            Constraint::AcceptedRange {
                min: 0.5,
                max: Some(5.0),
                inclusive: false
            }
        );

        let max_only = r#"
models:
  - name: m
    columns:
      - name: x
        tests:
          - accepted_range: { max_value: 5 }
"#;
        assert!(matches!(load(max_only), Err(DomainError::SchemaError(_))));
    }

    #[test]
    fn test_relationship_requires_field() {
        let yaml = r#"
models:
  - name: m
    columns:
      - name: x
        tests:
          - relationships: { to: "ref('n')" }
"#;
        assert!(matches!(load(yaml), Err(DomainError::SchemaError(_))));
    }
}

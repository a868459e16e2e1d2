// assay-core/src/domain/project/model.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named logical table: its columns and the checks declared on them.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Model {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materialized: Option<MaterializationType>,

    #[serde(default)]
    pub columns: Vec<Column>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            materialized: None,
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Models this one reads through `Relationship` constraints, self-references excluded.
    pub fn upstream_models(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .flat_map(|c| c.constraints.iter())
            .filter_map(|constraint| match constraint {
                Constraint::Relationship { target_model, .. } if *target_model != self.name => {
                    Some(target_model.as_str())
                }
                _ => None,
            })
    }

    pub fn constraint_count(&self) -> usize {
        self.columns.iter().map(|c| c.constraints.len()).sum()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Column {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            constraints: Vec::new(),
        }
    }

    pub fn with(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// A checkable rule attached to a column.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    NotNull,
    Unique,
    AcceptedRange {
        min: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(default = "default_inclusive")]
        inclusive: bool,
    },
    Relationship {
        target_model: String,
        target_field: String,
    },
}

fn default_inclusive() -> bool {
    true
}

impl Constraint {
    pub fn kind(&self) -> &'static str {
        match self {
            Constraint::NotNull => "not_null",
            Constraint::Unique => "unique",
            Constraint::AcceptedRange { .. } => "accepted_range",
            Constraint::Relationship { .. } => "relationships",
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::NotNull | Constraint::Unique => f.write_str(self.kind()),
            Constraint::AcceptedRange {
                min,
                max,
                inclusive,
            } => {
                let (open, close) = if *inclusive { ('[', ']') } else { ('(', ')') };
                match max {
                    Some(max) => write!(f, "accepted_range {open}{min}, {max}{close}"),
                    None => write!(f, "accepted_range {open}{min}, +inf)"),
                }
            }
            Constraint::Relationship {
                target_model,
                target_field,
            } => write!(f, "relationships -> {target_model}.{target_field}"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MaterializationType {
    View,
    Table,
    Ephemeral,
    Incremental,
}

impl MaterializationType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "view" => Some(Self::View),
            "table" => Some(Self::Table),
            "ephemeral" => Some(Self::Ephemeral),
            "incremental" => Some(Self::Incremental),
            _ => None,
        }
    }
}

impl fmt::Display for MaterializationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::View => "view",
            Self::Table => "table",
            Self::Ephemeral => "ephemeral",
            Self::Incremental => "incremental",
        };
        f.write_str(s)
    }
}

// assay-core/src/infrastructure/adapters/memory.rs

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::quality::Row;
use crate::error::AssayError;
use crate::ports::row_source::RowSource;

/// Rows held in memory, keyed by model. Used for embedding and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemorySource {
    tables: HashMap<String, Vec<Row>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, model: impl Into<String>, rows: Vec<Row>) -> Self {
        self.insert(model, rows);
        self
    }

    pub fn insert(&mut self, model: impl Into<String>, rows: Vec<Row>) {
        self.tables.insert(model.into(), rows);
    }
}

#[async_trait]
impl RowSource for InMemorySource {
    async fn fetch_rows(&self, model: &str) -> Result<Vec<Row>, AssayError> {
        self.tables
            .get(model)
            .cloned()
            .ok_or_else(|| AssayError::InternalError(format!("No rows loaded for model '{model}'")))
    }

    fn engine_name(&self) -> &str {
        "memory"
    }
}

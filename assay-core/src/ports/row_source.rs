// assay-core/src/ports/row_source.rs

// What the validation pipeline needs from the data side, without knowing how
// the rows were materialized (DuckDB table, CSV file, in-memory fixture...).

use crate::domain::quality::Row;
use crate::error::AssayError;
use async_trait::async_trait;

#[async_trait]
pub trait RowSource: Send + Sync {
    /// Every row currently materialized for `model`.
    /// May block: the pipeline calls it from the blocking pool.
    async fn fetch_rows(&self, model: &str) -> Result<Vec<Row>, AssayError>;

    fn engine_name(&self) -> &str;
}

// assay-core/src/infrastructure/adapters/duckdb.rs

use async_trait::async_trait;
use duckdb::types::Value as DuckValue;
use duckdb::{Config, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

// Imports Hexagonaux
use crate::domain::quality::{Row, Value};
use crate::error::AssayError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use crate::ports::row_source::RowSource;

/// Column as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

pub struct DuckDbSource {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbSource {
    pub fn new(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();

        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, InfrastructureError> {
        lock(&self.conn)
    }

    pub fn execute(&self, query: &str) -> Result<(), InfrastructureError> {
        let conn = self.lock()?;
        conn.execute(query, [])?;
        Ok(())
    }

    /// Exposes a CSV file as a view named after the model.
    pub fn register_csv(&self, name: &str, path: &Path) -> Result<(), InfrastructureError> {
        debug!(model = name, path = ?path, "Registering CSV source");
        let query = format!(
            "CREATE OR REPLACE VIEW {} AS SELECT * FROM read_csv_auto('{}')",
            quote_ident(name),
            path.display().to_string().replace('\'', "''")
        );
        self.execute(&query)
    }

    pub fn fetch_columns(&self, table_name: &str) -> Result<Vec<ColumnInfo>, InfrastructureError> {
        table_info(&self.lock()?, table_name)
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, InfrastructureError> {
    conn.lock().map_err(|_| InfrastructureError::Database(DatabaseError::Poisoned))
}

fn table_info(conn: &Connection, table_name: &str) -> Result<Vec<ColumnInfo>, InfrastructureError> {
    let mut stmt = conn.prepare(&format!(
        "PRAGMA table_info('{}')",
        table_name.replace('\'', "''")
    ))?;

    let rows = stmt.query_map([], |row| {
        Ok(ColumnInfo {
            name: row.get("name")?,
            data_type: row.get("type")?,
        })
    })?;

    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }
    Ok(columns)
}

/// Blocking: holds the connection for the whole scan.
fn select_all(
    conn: &Mutex<Connection>,
    table_name: &str,
) -> Result<Vec<Row>, InfrastructureError> {
    let conn = lock(conn)?;
    let columns = table_info(&conn, table_name)?;
    if columns.is_empty() {
        return Err(InfrastructureError::ConfigError(format!(
            "Table or view '{}' does not exist",
            table_name
        )));
    }

    let projection = columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let query = format!("SELECT {} FROM {}", projection, quote_ident(table_name));

    let mut stmt = conn.prepare(&query)?;
    let mut rows = stmt.query([])?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Row::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            let raw: DuckValue = row.get(i)?;
            record.insert(column.name.clone(), from_duck(raw));
        }
        out.push(record);
    }
    Ok(out)
}

#[async_trait]
impl RowSource for DuckDbSource {
    async fn fetch_rows(&self, model: &str) -> Result<Vec<Row>, AssayError> {
        let conn = Arc::clone(&self.conn);
        let table = model.to_string();
        let rows = tokio::task::spawn_blocking(move || select_all(&conn, &table))
            .await
            .map_err(|e| AssayError::InternalError(format!("DuckDB task failed: {e}")))??;
        Ok(rows)
    }

    fn engine_name(&self) -> &str {
        "duckdb"
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn from_duck(raw: DuckValue) -> Value {
    match raw {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(i) => Value::Int(i.into()),
        DuckValue::SmallInt(i) => Value::Int(i.into()),
        DuckValue::Int(i) => Value::Int(i.into()),
        DuckValue::BigInt(i) => Value::Int(i),
        DuckValue::UTinyInt(i) => Value::Int(i.into()),
        DuckValue::USmallInt(i) => Value::Int(i.into()),
        DuckValue::UInt(i) => Value::Int(i.into()),
        DuckValue::UBigInt(i) => i64::try_from(i)
            .map(Value::Int)
            .unwrap_or(Value::Float(i as f64)),
        DuckValue::HugeInt(i) => i64::try_from(i)
            .map(Value::Int)
            .unwrap_or(Value::Float(i as f64)),
        DuckValue::Float(f) => Value::Float(f.into()),
        DuckValue::Double(f) => Value::Float(f),
        DuckValue::Decimal(d) => {
            let text = d.to_string();
            text.parse::<f64>()
                .map(Value::Float)
                .unwrap_or(Value::Text(text))
        }
        DuckValue::Text(s) => Value::Text(s),
        DuckValue::Enum(s) => Value::Text(s),
        // Dates, blobs and nested types are compared by their rendering
        other => Value::Text(format!("{other:?}")),
    }
}

// ==========================================
// Layout Exporter - schema catalog access
// ==========================================
// Red line: no resolution/business logic here, only query shapes.
// The trait is the seam that keeps the resolver and planner testable
// without a live database and the backend driver swappable.
// ==========================================

use crate::error::ExportResult;
use rusqlite::types::Value;
use rusqlite::Connection;

/// A fetched result set: column names as reported by the database, rows as
/// text-rendered values (NULL stays `None`).
#[derive(Debug, Clone)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RowSet {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Catalog-lookup capability used by the resolver, planner and
/// materializer. Exactly the four query shapes of the run: existence
/// probes, prefix-filtered table listing, distinct-key enumeration and
/// (un)filtered selects.
pub trait SchemaCatalog {
    /// Zero-row probe: true when the table exists and is selectable.
    fn table_exists(&self, table: &str) -> ExportResult<bool>;

    /// Tables whose name starts with `prefix`, in deterministic order.
    fn list_tables(&self, prefix: &str) -> ExportResult<Vec<String>>;

    /// Column names of `table`, in ordinal order.
    fn table_columns(&self, table: &str) -> ExportResult<Vec<String>>;

    /// Distinct non-null values of `key_column`, unsorted.
    fn distinct_keys(&self, table: &str, key_column: &str) -> ExportResult<Vec<String>>;

    /// Full select, optionally restricted to `key IN (values...)`.
    fn select_rows(
        &self,
        table: &str,
        key_filter: Option<(&str, &[String])>,
    ) -> ExportResult<RowSet>;
}

/// `SchemaCatalog` over a shared, non-pooled rusqlite connection.
pub struct SqliteCatalog<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteCatalog<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

/// Double-quote an identifier, escaping embedded quotes. Names come out of
/// the catalog or the normalizer, but quoting stays unconditional.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(format!("{}", f)),
        Value::Text(s) => Some(s),
        Value::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
    }
}

impl SchemaCatalog for SqliteCatalog<'_> {
    fn table_exists(&self, table: &str) -> ExportResult<bool> {
        let sql = format!("SELECT * FROM {} LIMIT 0", quote_ident(table));
        Ok(self.conn.prepare(&sql).is_ok())
    }

    fn list_tables(&self, prefix: &str) -> ExportResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE ?1 ORDER BY name",
        )?;
        let names = stmt
            .query_map([format!("{}%", prefix)], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn table_columns(&self, table: &str) -> ExportResult<Vec<String>> {
        let sql = format!("SELECT * FROM {} LIMIT 0", quote_ident(table));
        let stmt = self.conn.prepare(&sql)?;
        Ok(stmt.column_names().iter().map(|c| c.to_string()).collect())
    }

    fn distinct_keys(&self, table: &str, key_column: &str) -> ExportResult<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT {key} FROM {table} WHERE {key} IS NOT NULL",
            key = quote_ident(key_column),
            table = quote_ident(table),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next()? {
            if let Some(text) = value_to_text(row.get::<_, Value>(0)?) {
                keys.push(text);
            }
        }
        Ok(keys)
    }

    fn select_rows(
        &self,
        table: &str,
        key_filter: Option<(&str, &[String])>,
    ) -> ExportResult<RowSet> {
        let sql = match key_filter {
            Some((key, values)) => {
                let placeholders = vec!["?"; values.len()].join(", ");
                format!(
                    "SELECT * FROM {} WHERE {} IN ({})",
                    quote_ident(table),
                    quote_ident(key),
                    placeholders,
                )
            }
            None => format!("SELECT * FROM {}", quote_ident(table)),
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let arity = columns.len();

        let mut rows = match key_filter {
            Some((_, values)) => stmt.query(rusqlite::params_from_iter(values.iter()))?,
            None => stmt.query([])?,
        };

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Vec::with_capacity(arity);
            for i in 0..arity {
                record.push(value_to_text(row.get::<_, Value>(i)?));
            }
            out.push(record);
        }

        Ok(RowSet {
            columns,
            rows: out,
        })
    }
}

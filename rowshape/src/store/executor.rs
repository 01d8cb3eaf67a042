use crate::common::{ColumnDescriptor, Value};
use crate::errors::RowshapeResult;
use crate::mapper::Row;
use crate::query::QueryWithArgs;
use itertools::Itertools;
use std::ops::Deref;
use std::sync::Arc;

/// One complete layout and contents of a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableImage {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Row>,
}

impl TableImage {
    pub fn new(columns: Vec<ColumnDescriptor>, rows: Vec<Row>) -> Self {
        TableImage { columns, rows }
    }
}

/// The primitives every SQL backend provides.
///
/// The migration engine, the version table and the query helpers only ever
/// talk to the database through this trait. Implementations must be
/// `Send + Sync`; callers serialize writes with the database lock.
pub trait SqlExecutorProvider: Send + Sync {
    /// Runs a statement and returns the number of affected rows.
    fn execute(&self, sql: &str, args: &[Value]) -> RowshapeResult<usize>;

    /// Runs a query and returns every row, columns in result order.
    fn query(&self, sql: &str, args: &[Value]) -> RowshapeResult<Vec<Row>>;

    fn table_exists(&self, table: &str) -> RowshapeResult<bool>;

    /// Makes `table` have exactly `columns`. Creates the table if missing.
    /// Existing rows need not survive a layout change; callers rewrite them.
    fn create_or_alter_columns(&self, table: &str, columns: &[ColumnDescriptor]) -> RowshapeResult<()>;

    /// Applies `images` to `table` in order, each one laying out the table
    /// and replacing all of its rows, and returns the number of rows
    /// inserted. Either every image is applied or, on error, the table keeps
    /// the layout and rows it had before the call.
    fn rewrite_table(&self, table: &str, images: &[TableImage]) -> RowshapeResult<usize>;
}

/// Cloneable handle to a [SqlExecutorProvider].
#[derive(Clone)]
pub struct SqlExecutor {
    inner: Arc<dyn SqlExecutorProvider>,
}

impl SqlExecutor {
    pub fn new<T: SqlExecutorProvider + 'static>(inner: T) -> Self {
        SqlExecutor {
            inner: Arc::new(inner),
        }
    }

    /// Runs a rendered builder query. Arguments are bound as text.
    pub fn query_built(&self, query: &QueryWithArgs) -> RowshapeResult<Vec<Row>> {
        let args = query
            .args
            .iter()
            .map(|arg| Value::Str(arg.clone()))
            .collect::<Vec<_>>();
        self.inner.query(&query.sql, &args)
    }

    /// Inserts one row and returns the affected count.
    pub fn insert_row(&self, table: &str, row: &Row) -> RowshapeResult<usize> {
        let sql = insert_sql(table, row);
        let args = row.values().cloned().collect::<Vec<_>>();
        self.inner.execute(&sql, &args)
    }
}

impl Deref for SqlExecutor {
    type Target = Arc<dyn SqlExecutorProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// `INSERT INTO table (a, b) VALUES (?, ?)` for the columns of `row`.
pub fn insert_sql(table: &str, row: &Row) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        row.keys().join(", "),
        row.keys().map(|_| "?").join(", ")
    )
}

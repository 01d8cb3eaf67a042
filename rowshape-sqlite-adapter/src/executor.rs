use crate::config::SqliteConfig;
use crate::ddl::{copy_rows_sql, create_table_sql, expected_columns, TableColumn};
use crate::wrapper::{value_from_ref, SqlValue, SqliteAdapterResult};
use parking_lot::Mutex;
use rowshape::common::{ColumnDescriptor, Value};
use rowshape::errors::RowshapeResult;
use rowshape::mapper::Row;
use rowshape::store::{insert_sql, SqlExecutorProvider, TableImage};
use rusqlite::{params_from_iter, Connection};
use std::sync::Arc;
use std::time::Duration;

/// [SqlExecutorProvider] over a single SQLite connection.
///
/// Cloneable; clones share the connection. Statements are serialized on an
/// internal mutex, so the executor is safe to share between threads even
/// outside the database lock.
#[derive(Clone)]
pub struct SqliteExecutor {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteExecutor {
    pub fn open(path: &str) -> RowshapeResult<Self> {
        let config = SqliteConfig::new();
        config.set_db_path(Some(path));
        Self::with_config(&config)
    }

    pub fn open_in_memory() -> RowshapeResult<Self> {
        Self::with_config(&SqliteConfig::new())
    }

    pub fn with_config(config: &SqliteConfig) -> RowshapeResult<Self> {
        Ok(Self::connect(config)?)
    }

    fn connect(config: &SqliteConfig) -> SqliteAdapterResult<Self> {
        let conn = match config.db_path() {
            Some(path) => {
                log::debug!("Opening SQLite database at {}", path);
                Connection::open(&path)?
            }
            None => {
                log::debug!("Opening in-memory SQLite database");
                Connection::open_in_memory()?
            }
        };
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms()))?;
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = {};",
            config.journal_mode().pragma_value()
        ))?;
        if config.foreign_keys() {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }
        Ok(SqliteExecutor {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn run_execute(&self, sql: &str, args: &[Value]) -> SqliteAdapterResult<usize> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        Ok(stmt.execute(params_from_iter(args.iter().map(SqlValue)))?)
    }

    fn run_query(&self, sql: &str, args: &[Value]) -> SqliteAdapterResult<Vec<Row>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(args.iter().map(SqlValue)))?;

        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut out = Row::with_capacity(names.len());
            for (index, name) in names.iter().enumerate() {
                out.insert(name.clone(), value_from_ref(row.get_ref(index)?)?);
            }
            result.push(out);
        }
        Ok(result)
    }

    fn table_columns(conn: &Connection, table: &str) -> SqliteAdapterResult<Vec<TableColumn>> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
        let columns = stmt
            .query_map([], |row| {
                Ok(TableColumn {
                    name: row.get("name")?,
                    declared_type: row.get::<_, String>("type")?.to_uppercase(),
                    not_null: row.get::<_, i64>("notnull")? != 0,
                    primary_key: row.get::<_, i64>("pk")? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    fn has_table(&self, table: &str) -> SqliteAdapterResult<bool> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn layout(&self, table: &str, columns: &[ColumnDescriptor]) -> SqliteAdapterResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        Self::apply_layout(&tx, table, columns)?;
        tx.commit()?;
        Ok(())
    }

    /// Creates `table` or rebuilds it with `columns`, keeping the rows of
    /// the columns both layouts share. Runs inside the caller's transaction.
    fn apply_layout(conn: &Connection, table: &str, columns: &[ColumnDescriptor]) -> SqliteAdapterResult<()> {
        let existing = Self::table_columns(conn, table)?;

        if existing.is_empty() {
            log::debug!("Creating table {}", table);
            conn.execute_batch(&create_table_sql(table, columns))?;
            return Ok(());
        }
        if existing == expected_columns(columns) {
            return Ok(());
        }

        log::info!("Rebuilding table {} with {} columns", table, columns.len());
        let rebuild = format!("{}_rebuild", table);
        let shared: Vec<&str> = columns
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| existing.iter().any(|e| e.name == *name))
            .collect();

        conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", rebuild))?;
        conn.execute_batch(&create_table_sql(&rebuild, columns))?;
        if !shared.is_empty() {
            conn.execute_batch(&copy_rows_sql(table, &rebuild, &shared))?;
        }
        conn.execute_batch(&format!("DROP TABLE {}", table))?;
        conn.execute_batch(&format!("ALTER TABLE {} RENAME TO {}", rebuild, table))?;
        Ok(())
    }

    fn rewrite(&self, table: &str, images: &[TableImage]) -> SqliteAdapterResult<usize> {
        let mut conn = self.conn.lock();
        // dropped without commit on any error, which rolls everything back
        let tx = conn.transaction()?;
        let mut written = 0;
        for image in images {
            Self::apply_layout(&tx, table, &image.columns)?;
            tx.execute(&format!("DELETE FROM {}", table), [])?;
            for row in &image.rows {
                let mut stmt = tx.prepare_cached(&insert_sql(table, row))?;
                written += stmt.execute(params_from_iter(row.values().map(SqlValue)))?;
            }
        }
        tx.commit()?;
        log::debug!("Rewrote table {} with {} rows", table, written);
        Ok(written)
    }
}

impl SqlExecutorProvider for SqliteExecutor {
    fn execute(&self, sql: &str, args: &[Value]) -> RowshapeResult<usize> {
        log::trace!("execute: {}", sql);
        Ok(self.run_execute(sql, args)?)
    }

    fn query(&self, sql: &str, args: &[Value]) -> RowshapeResult<Vec<Row>> {
        log::trace!("query: {}", sql);
        Ok(self.run_query(sql, args)?)
    }

    fn table_exists(&self, table: &str) -> RowshapeResult<bool> {
        Ok(self.has_table(table)?)
    }

    fn create_or_alter_columns(&self, table: &str, columns: &[ColumnDescriptor]) -> RowshapeResult<()> {
        Ok(self.layout(table, columns)?)
    }

    fn rewrite_table(&self, table: &str, images: &[TableImage]) -> RowshapeResult<usize> {
        Ok(self.rewrite(table, images)?)
    }
}

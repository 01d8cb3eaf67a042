use rowshape::common::{ColumnDescriptor, Value};
use rowshape::errors::RowshapeResult;
use rowshape::mapper::Row;
use rowshape::migration::EntityMeta;
use rowshape::rowshape::Rowshape;
use rowshape::rowshape_builder::RowshapeBuilder;
use rowshape::store::{SqlExecutor, SqlExecutorProvider, TableImage};
use rowshape_sqlite_adapter::SqliteExecutor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;

/// Runs `test` against a fresh context and panics with the error it
/// returned, if any.
pub fn run_test<B, T>(before: B, test: T)
where
    B: FnOnce() -> RowshapeResult<TestContext> + std::panic::UnwindSafe,
    T: FnOnce(TestContext) -> RowshapeResult<()> + std::panic::UnwindSafe,
{
    let start_time = Instant::now();
    let result = std::panic::catch_unwind(|| {
        let ctx = before().map_err(|e| format!("Before run failed: {:?}", e))?;
        test(ctx).map_err(|e| format!("Test failed: {:?}", e))
    });

    let failure = match result {
        Ok(Ok(())) => return,
        Ok(Err(message)) => message,
        Err(panic_err) => {
            if let Some(s) = panic_err.downcast_ref::<&str>() {
                format!("Panic: {}", s)
            } else if let Some(s) = panic_err.downcast_ref::<String>() {
                format!("Panic: {}", s)
            } else {
                "Panic: unknown payload".to_string()
            }
        }
    };

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {:?}", start_time.elapsed());
    eprintln!("{}", failure);
    eprintln!("=====================================================\n");
    panic!("{}", failure);
}

/// A temporary SQLite database file, removed when the last clone drops.
#[derive(Clone)]
pub struct TestContext {
    _dir: Arc<TempDir>,
    path: String,
}

impl TestContext {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// A new connection to the context's database.
    pub fn executor(&self) -> RowshapeResult<SqlExecutor> {
        Ok(SqlExecutor::new(SqliteExecutor::open(&self.path)?))
    }

    pub fn counting_executor(&self) -> RowshapeResult<CountingExecutor> {
        Ok(CountingExecutor::new(SqliteExecutor::open(&self.path)?))
    }

    /// A builder already pointed at the context's database.
    pub fn builder(&self) -> RowshapeResult<RowshapeBuilder> {
        Ok(Rowshape::builder().executor(self.executor()?))
    }

    pub fn open(&self, metas: &[EntityMeta]) -> RowshapeResult<Rowshape> {
        let mut builder = self.builder()?;
        for meta in metas {
            builder = builder.register(meta.clone());
        }
        builder.open()
    }
}

pub fn create_test_context() -> RowshapeResult<TestContext> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("rowshape.db").to_string_lossy().into_owned();
    Ok(TestContext {
        _dir: Arc::new(dir),
        path,
    })
}

/// Creates `table` with `columns` and inserts `rows` as given, ids included.
pub fn seed_table(
    executor: &SqlExecutor,
    table: &str,
    columns: &[ColumnDescriptor],
    rows: &[Vec<(&str, Value)>],
) -> RowshapeResult<()> {
    executor.create_or_alter_columns(table, columns)?;
    for values in rows {
        let row: Row = values
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        executor.insert_row(table, &row)?;
    }
    Ok(())
}

/// Executor wrapper counting executed statements and table rewrites.
/// Queries and layout checks are not counted.
#[derive(Clone)]
pub struct CountingExecutor {
    inner: SqliteExecutor,
    writes: Arc<AtomicUsize>,
}

impl CountingExecutor {
    pub fn new(inner: SqliteExecutor) -> Self {
        CountingExecutor {
            inner,
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl SqlExecutorProvider for CountingExecutor {
    fn execute(&self, sql: &str, args: &[Value]) -> RowshapeResult<usize> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(sql, args)
    }

    fn query(&self, sql: &str, args: &[Value]) -> RowshapeResult<Vec<Row>> {
        self.inner.query(sql, args)
    }

    fn table_exists(&self, table: &str) -> RowshapeResult<bool> {
        self.inner.table_exists(table)
    }

    fn create_or_alter_columns(&self, table: &str, columns: &[ColumnDescriptor]) -> RowshapeResult<()> {
        self.inner.create_or_alter_columns(table, columns)
    }

    fn rewrite_table(&self, table: &str, images: &[TableImage]) -> RowshapeResult<usize> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.rewrite_table(table, images)
    }
}

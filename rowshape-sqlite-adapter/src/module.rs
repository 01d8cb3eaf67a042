use crate::config::{JournalMode, SqliteConfig};
use crate::executor::SqliteExecutor;
use rowshape::errors::RowshapeResult;
use rowshape::store::{ExecutorModule, SqlExecutor};

/// Rowshape executor module backed by SQLite.
///
/// # Examples
///
/// ```rust,ignore
/// use rowshape::rowshape::Rowshape;
/// use rowshape_sqlite_adapter::{JournalMode, SqliteModule};
///
/// let db = Rowshape::builder()
///     .load_module(
///         SqliteModule::with_config()
///             .db_path("/path/to/things.db")
///             .journal_mode(JournalMode::Wal)
///             .build(),
///     )
///     .open()?;
/// ```
pub struct SqliteModule {
    config: SqliteConfig,
}

impl SqliteModule {
    #[inline]
    pub fn with_config() -> SqliteModuleBuilder {
        SqliteModuleBuilder::new()
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }
}

impl ExecutorModule for SqliteModule {
    fn get_executor(&self) -> RowshapeResult<SqlExecutor> {
        let executor = SqliteExecutor::with_config(&self.config)?;
        Ok(SqlExecutor::new(executor))
    }
}

/// Fluent configuration of a [SqliteModule].
pub struct SqliteModuleBuilder {
    config: SqliteConfig,
}

impl Default for SqliteModuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteModuleBuilder {
    #[inline]
    pub fn new() -> SqliteModuleBuilder {
        SqliteModuleBuilder {
            config: SqliteConfig::new(),
        }
    }

    pub fn db_path(self, path: &str) -> Self {
        self.config.set_db_path(Some(path));
        self
    }

    /// Uses a private in-memory database. This is the default.
    pub fn in_memory(self) -> Self {
        self.config.set_db_path(None);
        self
    }

    pub fn busy_timeout_ms(self, timeout: u64) -> Self {
        self.config.set_busy_timeout_ms(timeout);
        self
    }

    pub fn journal_mode(self, mode: JournalMode) -> Self {
        self.config.set_journal_mode(mode);
        self
    }

    pub fn foreign_keys(self, enabled: bool) -> Self {
        self.config.set_foreign_keys(enabled);
        self
    }

    pub fn build(self) -> SqliteModule {
        SqliteModule {
            config: self.config,
        }
    }
}

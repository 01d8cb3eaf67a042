use parking_lot::RwLock;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// SQLite `journal_mode` setting applied when a connection opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JournalMode {
    #[default]
    Delete,
    Truncate,
    Wal,
    Memory,
}

impl JournalMode {
    pub fn pragma_value(self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Wal => "WAL",
            JournalMode::Memory => "MEMORY",
        }
    }
}

impl Display for JournalMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pragma_value())
    }
}

/// SQLite connection settings.
///
/// Cloneable; clones share the same settings. Built through
/// [SqliteModuleBuilder](crate::SqliteModuleBuilder) and read once when the
/// executor opens its connection. A config without a path opens an
/// in-memory database.
#[derive(Clone)]
pub struct SqliteConfig {
    inner: Arc<SqliteConfigInner>,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteConfig {
    #[inline]
    pub fn new() -> SqliteConfig {
        SqliteConfig {
            inner: Arc::new(SqliteConfigInner::new()),
        }
    }

    /// Database file path; `None` means in-memory.
    #[inline]
    pub fn db_path(&self) -> Option<String> {
        self.inner.db_path.read().clone()
    }

    #[inline]
    pub(crate) fn set_db_path(&self, path: Option<&str>) {
        *self.inner.db_path.write() = path.map(str::to_string);
    }

    #[inline]
    pub fn busy_timeout_ms(&self) -> u64 {
        self.inner.busy_timeout_ms.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_busy_timeout_ms(&self, timeout: u64) {
        self.inner.busy_timeout_ms.store(timeout, Ordering::Relaxed)
    }

    #[inline]
    pub fn journal_mode(&self) -> JournalMode {
        *self.inner.journal_mode.read()
    }

    #[inline]
    pub(crate) fn set_journal_mode(&self, mode: JournalMode) {
        *self.inner.journal_mode.write() = mode;
    }

    #[inline]
    pub fn foreign_keys(&self) -> bool {
        self.inner.foreign_keys.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_foreign_keys(&self, enabled: bool) {
        self.inner.foreign_keys.store(enabled, Ordering::Relaxed)
    }
}

struct SqliteConfigInner {
    db_path: RwLock<Option<String>>,
    busy_timeout_ms: AtomicU64,
    journal_mode: RwLock<JournalMode>,
    foreign_keys: AtomicBool,
}

impl SqliteConfigInner {
    /// Default busy timeout: 5 seconds
    const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

    fn new() -> Self {
        SqliteConfigInner {
            db_path: RwLock::new(None),
            busy_timeout_ms: AtomicU64::new(Self::DEFAULT_BUSY_TIMEOUT_MS),
            journal_mode: RwLock::new(JournalMode::default()),
            foreign_keys: AtomicBool::new(false),
        }
    }
}

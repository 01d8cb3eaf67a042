use crate::common::DbLock;
use crate::errors::RowshapeResult;
use crate::mapper::{entity_from_row, entity_to_row, Entity, IdMode, Row};
use crate::migration::{DbMigrator, EntityMeta, VersionTable};
use crate::query::{select, QueryOpts};
use crate::rowshape_builder::RowshapeBuilder;
use crate::rowshape_config::RowshapeConfig;
use crate::store::SqlExecutor;
use std::sync::Arc;

/// An opened database: executor, lock, configuration and version table.
///
/// Cloning is cheap; clones share everything. All helpers on this type run
/// inside the database lock.
#[derive(Clone)]
pub struct Rowshape {
    inner: Arc<RowshapeInner>,
}

struct RowshapeInner {
    config: RowshapeConfig,
    executor: SqlExecutor,
    lock: DbLock,
    versions: VersionTable,
    migrator: DbMigrator,
}

impl Rowshape {
    pub fn builder() -> RowshapeBuilder {
        RowshapeBuilder::new()
    }

    pub(crate) fn new(config: RowshapeConfig, executor: SqlExecutor) -> Self {
        let lock = DbLock::new();
        let versions = VersionTable::new(executor.clone(), &config.version_table());
        let migrator = DbMigrator::new(executor.clone(), lock.clone(), config.clone());
        Rowshape {
            inner: Arc::new(RowshapeInner {
                config,
                executor,
                lock,
                versions,
                migrator,
            }),
        }
    }

    pub(crate) fn initialize(&self, migrate: bool) -> RowshapeResult<()> {
        self.inner.config.freeze();
        self.inner.lock.run(|| {
            self.inner.versions.ensure()?;
            if migrate {
                let reports = self.inner.migrator.migrate_single_table_entities()?;
                log::debug!("Opened with {} single-table entities checked", reports.len());
            }
            Ok(())
        })
    }

    pub fn config(&self) -> &RowshapeConfig {
        &self.inner.config
    }

    pub fn executor(&self) -> &SqlExecutor {
        &self.inner.executor
    }

    pub fn lock(&self) -> &DbLock {
        &self.inner.lock
    }

    pub fn version_table(&self) -> &VersionTable {
        &self.inner.versions
    }

    pub fn migrator(&self) -> &DbMigrator {
        &self.inner.migrator
    }

    /// Creates `table` with the current layout of `meta` and records the
    /// current version if none is recorded yet.
    pub fn create_table(&self, table: &str, meta: &EntityMeta) -> RowshapeResult<()> {
        self.inner.lock.run(|| {
            self.inner
                .executor
                .create_or_alter_columns(table, &meta.shape().columns())?;
            if self.inner.versions.get(meta.name())?.is_none() {
                self.inner
                    .versions
                    .set(meta.name(), meta.current_version(), Some("created"))?;
            }
            Ok(())
        })
    }

    pub fn select_rows<F>(&self, table: &str, columns: &[&str], opts: F) -> RowshapeResult<Vec<Row>>
    where
        F: FnOnce(&mut QueryOpts),
    {
        let query = select(table, columns, opts);
        self.inner
            .lock
            .run(|| self.inner.executor.query_built(&query))
    }

    /// Inserts `entity` into `table`; the database assigns its id.
    pub fn insert<E: Entity>(&self, table: &str, entity: &E) -> RowshapeResult<usize> {
        let row = entity_to_row(entity, IdMode::Skip)?;
        self.inner
            .lock
            .run(|| self.inner.executor.insert_row(table, &row))
    }

    pub fn select_entities<E, F>(&self, table: &str, opts: F) -> RowshapeResult<Vec<E>>
    where
        E: Entity,
        F: FnOnce(&mut QueryOpts),
    {
        let columns = E::descriptor().column_names();
        let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
        let rows = self.select_rows(table, &columns, opts)?;
        rows.iter().map(entity_from_row::<E>).collect()
    }
}

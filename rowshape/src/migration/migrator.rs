use crate::common::DbLock;
use crate::errors::{ErrorKind, RowshapeError, RowshapeResult};
use crate::mapper::{Entity, EntityDescriptor};
use crate::migration::{MigrationBundle, MigrationEngine, MigrationReport, VersionTable};
use crate::rowshape_config::{MissingVersion, RowshapeConfig};
use crate::store::SqlExecutor;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, OnceLock};

type BundleFactory = Arc<dyn Fn(&EntityDescriptor) -> RowshapeResult<MigrationBundle> + Send + Sync>;

/// Registration of one entity: its current version and shape, how to build
/// its migration bundle, and optionally the single table it lives in.
///
/// The bundle is built on first use and cached for the lifetime of the meta
/// and all its clones.
#[derive(Clone)]
pub struct EntityMeta {
    inner: Arc<EntityMetaInner>,
}

struct EntityMetaInner {
    name: String,
    current_version: u32,
    shape: EntityDescriptor,
    migrations: Option<BundleFactory>,
    limited_to_table: Option<String>,
    bundle: OnceLock<MigrationBundle>,
}

impl EntityMeta {
    pub fn new(name: &str, current_version: u32, shape: EntityDescriptor) -> Self {
        EntityMeta {
            inner: Arc::new(EntityMetaInner {
                name: name.to_string(),
                current_version,
                shape,
                migrations: None,
                limited_to_table: None,
                bundle: OnceLock::new(),
            }),
        }
    }

    /// Meta for an entity type, named after its descriptor.
    pub fn of<E: Entity>(current_version: u32) -> Self {
        let shape = E::descriptor();
        EntityMeta::new(shape.name(), current_version, shape.clone())
    }

    /// Sets how the migration bundle is built. `factory` receives the
    /// current shape and usually calls
    /// [define_migrations](crate::migration::define_migrations).
    pub fn with_migrations<F>(self, factory: F) -> Self
    where
        F: Fn(&EntityDescriptor) -> RowshapeResult<MigrationBundle> + Send + Sync + 'static,
    {
        self.rebuild(|inner| inner.migrations = Some(Arc::new(factory)))
    }

    /// Marks the entity as stored in exactly one table, making it part of
    /// [DbMigrator::migrate_single_table_entities].
    pub fn limited_to_table(self, table: &str) -> Self {
        let table = table.to_string();
        self.rebuild(move |inner| inner.limited_to_table = Some(table))
    }

    fn rebuild<F: FnOnce(&mut EntityMetaInner)>(self, change: F) -> Self {
        let mut inner = EntityMetaInner {
            name: self.inner.name.clone(),
            current_version: self.inner.current_version,
            shape: self.inner.shape.clone(),
            migrations: self.inner.migrations.clone(),
            limited_to_table: self.inner.limited_to_table.clone(),
            bundle: OnceLock::new(),
        };
        change(&mut inner);
        EntityMeta {
            inner: Arc::new(inner),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn current_version(&self) -> u32 {
        self.inner.current_version
    }

    pub fn shape(&self) -> &EntityDescriptor {
        &self.inner.shape
    }

    pub fn table(&self) -> Option<&str> {
        self.inner.limited_to_table.as_deref()
    }

    /// The migration bundle, built once. A failed build is not cached.
    pub fn bundle(&self) -> RowshapeResult<&MigrationBundle> {
        if let Some(bundle) = self.inner.bundle.get() {
            return Ok(bundle);
        }
        let bundle = match &self.inner.migrations {
            Some(factory) => factory(&self.inner.shape)?,
            None => MigrationBundle::single(self.inner.current_version, &self.inner.shape),
        };
        if bundle.latest_version() != self.inner.current_version {
            log::error!(
                "Migrations of '{}' end at version {}, but the entity is at version {}",
                self.inner.name,
                bundle.latest_version(),
                self.inner.current_version
            );
            return Err(RowshapeError::new(
                &format!(
                    "Migrations of '{}' end at version {}, but the entity is at version {}",
                    self.inner.name,
                    bundle.latest_version(),
                    self.inner.current_version
                ),
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(self.inner.bundle.get_or_init(|| bundle))
    }
}

impl Debug for EntityMeta {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityMeta")
            .field("name", &self.inner.name)
            .field("current_version", &self.inner.current_version)
            .field("limited_to_table", &self.inner.limited_to_table)
            .finish()
    }
}

/// Brings the tables of registered entities up to their current versions.
///
/// Every public operation runs inside the database lock. The version record
/// of an entity is written only after all of its tables migrated.
#[derive(Clone)]
pub struct DbMigrator {
    executor: SqlExecutor,
    lock: DbLock,
    config: RowshapeConfig,
    engine: MigrationEngine,
    versions: VersionTable,
}

impl DbMigrator {
    pub fn new(executor: SqlExecutor, lock: DbLock, config: RowshapeConfig) -> Self {
        let versions = VersionTable::new(executor.clone(), &config.version_table());
        DbMigrator {
            executor: executor.clone(),
            lock,
            engine: MigrationEngine::new(executor, config.clone()),
            config,
            versions,
        }
    }

    /// Migrates every registered entity that is limited to one table.
    pub fn migrate_single_table_entities(&self) -> RowshapeResult<Vec<MigrationReport>> {
        self.lock.run(|| {
            log::debug!("Migrating single-table entities");
            let mut reports = Vec::new();
            for meta in self.config.entities() {
                if meta.table().is_some() {
                    reports.push(self.migrate_single_table_entity(&meta)?);
                }
            }
            Ok(reports)
        })
    }

    pub fn migrate_single_table_entity(&self, meta: &EntityMeta) -> RowshapeResult<MigrationReport> {
        let table = match meta.table() {
            Some(table) => table,
            None => {
                log::error!("Entity '{}' is not limited to a single table", meta.name());
                return Err(RowshapeError::new(
                    &format!("Entity '{}' is not limited to a single table", meta.name()),
                    ErrorKind::InvalidOperation,
                ));
            }
        };

        self.lock.run(|| {
            let bundle = meta.bundle()?;
            if let Some(report) = self.create_if_new(table, meta)? {
                return Ok(report);
            }
            let stored = self.stored_version(meta, bundle)?;
            log::debug!(
                "Migrating '{}' in table '{}' from version {} to {}",
                meta.name(),
                table,
                stored,
                meta.current_version()
            );
            let report = self.engine.migrate(table, stored, bundle)?;
            if !report.is_noop() {
                self.versions.set(meta.name(), meta.current_version(), None)?;
            }
            Ok(report)
        })
    }

    /// Migrates several tables holding the same entity, calling
    /// `after_each` with the name of every migrated table.
    pub fn migrate_tables<F>(
        &self,
        tables: &[&str],
        meta: &EntityMeta,
        mut after_each: F,
    ) -> RowshapeResult<Vec<MigrationReport>>
    where
        F: FnMut(&str),
    {
        self.lock.run(|| {
            let bundle = meta.bundle()?;
            let stored = self.stored_version(meta, bundle)?;
            log::debug!("Migrating {} tables of '{}'", tables.len(), meta.name());

            let mut reports = Vec::with_capacity(tables.len());
            for table in tables {
                reports.push(self.migrate_table(table, stored, meta, &mut after_each)?);
            }

            log::debug!(
                "Finished tables of '{}', recording version {}",
                meta.name(),
                meta.current_version()
            );
            if stored != meta.current_version() {
                self.versions.set(meta.name(), meta.current_version(), None)?;
            }
            Ok(reports)
        })
    }

    /// Migrates one table from `stored` without touching the version table.
    pub fn migrate_table<F>(
        &self,
        table: &str,
        stored: u32,
        meta: &EntityMeta,
        after_each: F,
    ) -> RowshapeResult<MigrationReport>
    where
        F: FnOnce(&str),
    {
        self.lock.run(|| {
            let report = self.engine.migrate(table, stored, meta.bundle()?)?;
            after_each(table);
            Ok(report)
        })
    }

    /// Creates `table` at the current layout when neither the table nor a
    /// version record exists yet.
    fn create_if_new(&self, table: &str, meta: &EntityMeta) -> RowshapeResult<Option<MigrationReport>> {
        self.versions.ensure()?;
        if self.versions.get(meta.name())?.is_some() || self.executor.table_exists(table)? {
            return Ok(None);
        }
        log::debug!(
            "Creating table '{}' for '{}' at version {}",
            table,
            meta.name(),
            meta.current_version()
        );
        self.executor
            .create_or_alter_columns(table, &meta.shape().columns())?;
        self.versions
            .set(meta.name(), meta.current_version(), Some("created"))?;
        Ok(Some(MigrationReport::unchanged(table, meta.current_version())))
    }

    fn stored_version(&self, meta: &EntityMeta, bundle: &MigrationBundle) -> RowshapeResult<u32> {
        self.versions.ensure()?;
        match self.versions.get(meta.name())? {
            Some(version) => Ok(version),
            None => match self.config.missing_version_fallback() {
                MissingVersion::LowestDeclared => {
                    log::debug!(
                        "No version recorded for '{}', assuming version {}",
                        meta.name(),
                        bundle.lowest_version()
                    );
                    Ok(bundle.lowest_version())
                }
                MissingVersion::Fail => {
                    log::error!("No version recorded for '{}'", meta.name());
                    Err(RowshapeError::new(
                        &format!("No version recorded for '{}'", meta.name()),
                        ErrorKind::NotFound,
                    ))
                }
            },
        }
    }
}

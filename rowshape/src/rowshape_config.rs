//! Runtime configuration of a [Rowshape](crate::rowshape::Rowshape) handle.

use crate::common::validate_identifier;
use crate::errors::{ErrorKind, RowshapeError, RowshapeResult};
use crate::migration::EntityMeta;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default name of the table holding one version record per entity.
pub const DEFAULT_VERSION_TABLE: &str = "EntityVersions";

/// What the migration engine does with a row it cannot read or convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowFailurePolicy {
    /// Log the row, leave it out, carry on with the rest of the table.
    #[default]
    SkipRow,
    /// Stop the migration of the table at the first failing row.
    Abort,
}

/// How an entity with no version record is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingVersion {
    /// Assume the rows have the lowest declared shape.
    #[default]
    LowestDeclared,
    /// Refuse to migrate.
    Fail,
}

/// Shared configuration. Cloning is cheap and every clone sees the same
/// settings. Setters fail with `InvalidOperation` once the owning handle
/// has been opened.
#[derive(Clone)]
pub struct RowshapeConfig {
    inner: Arc<RowshapeConfigInner>,
}

impl Default for RowshapeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RowshapeConfig {
    pub fn new() -> Self {
        RowshapeConfig {
            inner: Arc::new(RowshapeConfigInner::new()),
        }
    }

    pub fn version_table(&self) -> String {
        self.inner.version_table.read().clone()
    }

    pub fn set_version_table(&self, table: &str) -> RowshapeResult<()> {
        self.inner.check_not_frozen("version table")?;
        validate_identifier(table, "version table")?;
        *self.inner.version_table.write() = table.to_string();
        Ok(())
    }

    pub fn row_failure_policy(&self) -> RowFailurePolicy {
        *self.inner.row_failure_policy.read()
    }

    pub fn set_row_failure_policy(&self, policy: RowFailurePolicy) -> RowshapeResult<()> {
        self.inner.check_not_frozen("row failure policy")?;
        *self.inner.row_failure_policy.write() = policy;
        Ok(())
    }

    /// Whether rows are rewritten after every version step or only after
    /// the last one.
    pub fn write_each_step(&self) -> bool {
        self.inner.write_each_step.load(Ordering::Relaxed)
    }

    pub fn set_write_each_step(&self, enabled: bool) -> RowshapeResult<()> {
        self.inner.check_not_frozen("write-each-step flag")?;
        self.inner.write_each_step.store(enabled, Ordering::Relaxed);
        Ok(())
    }

    pub fn missing_version_fallback(&self) -> MissingVersion {
        *self.inner.missing_version.read()
    }

    pub fn set_missing_version_fallback(&self, fallback: MissingVersion) -> RowshapeResult<()> {
        self.inner.check_not_frozen("missing version fallback")?;
        *self.inner.missing_version.write() = fallback;
        Ok(())
    }

    /// Registers an entity for [DbMigrator](crate::migration::DbMigrator).
    pub fn register_entity(&self, meta: EntityMeta) -> RowshapeResult<()> {
        self.inner.check_not_frozen("entity registry")?;
        if self.inner.entities.contains_key(meta.name()) {
            log::error!("Entity '{}' is already registered", meta.name());
            return Err(RowshapeError::new(
                &format!("Entity '{}' is already registered", meta.name()),
                ErrorKind::InvalidOperation,
            ));
        }
        self.inner.entities.insert(meta.name().to_string(), meta);
        Ok(())
    }

    pub fn entity(&self, name: &str) -> Option<EntityMeta> {
        self.inner.entities.get(name).map(|e| e.value().clone())
    }

    /// Registered entities sorted by name.
    pub fn entities(&self) -> Vec<EntityMeta> {
        let mut entities: Vec<EntityMeta> = self
            .inner
            .entities
            .iter()
            .map(|e| e.value().clone())
            .collect();
        entities.sort_by(|a, b| a.name().cmp(b.name()));
        entities
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.frozen.load(Ordering::Relaxed)
    }

    pub(crate) fn freeze(&self) {
        self.inner.frozen.store(true, Ordering::Relaxed);
    }
}

struct RowshapeConfigInner {
    frozen: AtomicBool,
    version_table: RwLock<String>,
    row_failure_policy: RwLock<RowFailurePolicy>,
    write_each_step: AtomicBool,
    missing_version: RwLock<MissingVersion>,
    entities: DashMap<String, EntityMeta>,
}

impl RowshapeConfigInner {
    fn new() -> Self {
        RowshapeConfigInner {
            frozen: AtomicBool::new(false),
            version_table: RwLock::new(DEFAULT_VERSION_TABLE.to_string()),
            row_failure_policy: RwLock::new(RowFailurePolicy::default()),
            write_each_step: AtomicBool::new(true),
            missing_version: RwLock::new(MissingVersion::default()),
            entities: DashMap::new(),
        }
    }

    fn check_not_frozen(&self, setting: &str) -> RowshapeResult<()> {
        if self.frozen.load(Ordering::Relaxed) {
            log::error!("Cannot change the {} after the database is opened", setting);
            return Err(RowshapeError::new(
                &format!("Cannot change the {} after the database is opened", setting),
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }
}

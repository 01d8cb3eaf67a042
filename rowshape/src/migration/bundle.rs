use crate::errors::{ErrorKind, RowshapeError, RowshapeResult};
use crate::mapper::{EntityDescriptor, Record};
use crate::migration::{FieldOverride, RenameHistory};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Combines the previous-shape record and the freshly built record of one
/// step into the record that step persists.
pub type Finalizer = Arc<dyn Fn(&Record, Record) -> RowshapeResult<Record> + Send + Sync>;

/// Value transforms and an optional finalizer applied while migrating
/// through one version.
#[derive(Clone, Default)]
pub struct Milestone {
    pub(crate) overrides: IndexMap<String, FieldOverride>,
    pub(crate) finalizer: Option<Finalizer>,
}

impl Milestone {
    /// Override for the field named `field` in the milestone's shape.
    pub fn override_for(&self, field: &str) -> Option<&FieldOverride> {
        self.overrides.get(field)
    }

    pub fn has_finalizer(&self) -> bool {
        self.finalizer.is_some()
    }

    pub fn finalize(&self, old: &Record, new: Record) -> RowshapeResult<Record> {
        match &self.finalizer {
            Some(finalizer) => finalizer(old, new),
            None => Ok(new),
        }
    }
}

impl Debug for Milestone {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Milestone")
            .field("overrides", &self.overrides)
            .field("finalizer", &self.finalizer.is_some())
            .finish()
    }
}

/// Everything the engine needs to move an entity's rows between versions.
///
/// Built once by [define_migrations](crate::migration::define_migrations)
/// and read-only afterwards. Always holds a shape for the latest version.
#[derive(Clone, Debug)]
pub struct MigrationBundle {
    pub(crate) latest_version: u32,
    pub(crate) shapes: BTreeMap<u32, EntityDescriptor>,
    pub(crate) renames: RenameHistory,
    pub(crate) milestones: BTreeMap<u32, Milestone>,
}

impl MigrationBundle {
    /// A bundle that only knows the latest shape.
    pub fn single(latest_version: u32, latest_shape: &EntityDescriptor) -> Self {
        let mut shapes = BTreeMap::new();
        shapes.insert(latest_version, latest_shape.clone());
        MigrationBundle {
            latest_version,
            shapes,
            renames: RenameHistory::new(),
            milestones: BTreeMap::new(),
        }
    }

    pub fn latest_version(&self) -> u32 {
        self.latest_version
    }

    pub fn lowest_version(&self) -> u32 {
        self.shapes
            .keys()
            .next()
            .copied()
            .unwrap_or(self.latest_version)
    }

    pub fn versions(&self) -> impl Iterator<Item = &u32> {
        self.shapes.keys()
    }

    pub fn shape(&self, version: u32) -> RowshapeResult<&EntityDescriptor> {
        self.shapes.get(&version).ok_or_else(|| {
            log::error!("No shape is registered for version {}", version);
            RowshapeError::new(
                &format!("No shape is registered for version {}", version),
                ErrorKind::MissingShape,
            )
        })
    }

    pub fn latest_shape(&self) -> RowshapeResult<&EntityDescriptor> {
        self.shape(self.latest_version)
    }

    pub fn renames(&self) -> &RenameHistory {
        &self.renames
    }

    pub fn milestone(&self, version: u32) -> Option<&Milestone> {
        self.milestones.get(&version)
    }

    /// Declared versions in `(from, to]`, always ending with `to`.
    pub fn steps_between(&self, from: u32, to: u32) -> Vec<u32> {
        if to <= from {
            return Vec::new();
        }
        let mut steps: Vec<u32> = self
            .shapes
            .range(from + 1..to)
            .map(|(version, _)| *version)
            .collect();
        steps.push(to);
        steps
    }
}

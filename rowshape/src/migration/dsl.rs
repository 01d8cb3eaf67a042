use crate::errors::{ErrorKind, RowshapeError, RowshapeResult};
use crate::mapper::{Entity, EntityDescriptor, Record};
use crate::migration::{FieldOverride, MigrationBundle, Milestone, RenameRecord};
use std::sync::Arc;

/// Declares the version history of one entity.
///
/// `block` registers older shapes with [MigrationDsl::version]; each
/// version may declare column renames and a milestone. The latest shape is
/// added when the block does not declare it. Declaration problems (a field
/// renamed twice in one version, a version declared twice or above
/// `latest_version`) fail the whole bundle.
///
/// ```rust
/// use rowshape::common::{int_col, str_col};
/// use rowshape::mapper::EntityDescriptor;
/// use rowshape::migration::define_migrations;
///
/// let v1 = EntityDescriptor::builder("Thing").id().field(int_col("label")).build().unwrap();
/// let v2 = EntityDescriptor::builder("Thing").id().field(str_col("name")).build().unwrap();
///
/// let bundle = define_migrations(2, &v2, |m| {
///     m.version(1, &v1, |_| {});
///     m.version(2, &v2, |v| {
///         v.rename(|r| {
///             r.field("name").from("label").to("name");
///         });
///         v.milestone(|ms| {
///             ms.modify("name", |o| {
///                 o.from_int(|i| format!("#{}", i));
///             });
///         });
///     });
/// })
/// .unwrap();
///
/// assert_eq!(bundle.renames().name_at_version("name", 1), "label");
/// ```
pub fn define_migrations<F>(
    latest_version: u32,
    latest_shape: &EntityDescriptor,
    block: F,
) -> RowshapeResult<MigrationBundle>
where
    F: FnOnce(&mut MigrationDsl),
{
    let mut dsl = MigrationDsl::new(latest_version);
    block(&mut dsl);
    if let Some(error) = dsl.error {
        return Err(error);
    }

    let mut bundle = dsl.bundle;
    bundle
        .shapes
        .entry(latest_version)
        .or_insert_with(|| latest_shape.clone());
    log::debug!(
        "Defined migrations for '{}' up to version {} ({} shapes, {} milestones)",
        latest_shape.name(),
        latest_version,
        bundle.shapes.len(),
        bundle.milestones.len()
    );
    Ok(bundle)
}

/// Receiver of [define_migrations]. Keeps the first declaration error.
pub struct MigrationDsl {
    bundle: MigrationBundle,
    error: Option<RowshapeError>,
}

impl MigrationDsl {
    fn new(latest_version: u32) -> Self {
        MigrationDsl {
            bundle: MigrationBundle {
                latest_version,
                shapes: Default::default(),
                renames: Default::default(),
                milestones: Default::default(),
            },
            error: None,
        }
    }

    /// Registers the shape valid at `version` and the changes that took
    /// effect at that version.
    pub fn version<F>(&mut self, version: u32, shape: &EntityDescriptor, block: F) -> &mut Self
    where
        F: FnOnce(&mut VersionBuilder),
    {
        if self.error.is_some() {
            return self;
        }
        if let Err(error) = self.add_version(version, shape, block) {
            self.error = Some(error);
        }
        self
    }

    /// [MigrationDsl::version] with the shape taken from an entity type.
    pub fn version_of<E, F>(&mut self, version: u32, block: F) -> &mut Self
    where
        E: Entity,
        F: FnOnce(&mut VersionBuilder),
    {
        self.version(version, E::descriptor(), block)
    }

    fn add_version<F>(&mut self, version: u32, shape: &EntityDescriptor, block: F) -> RowshapeResult<()>
    where
        F: FnOnce(&mut VersionBuilder),
    {
        if version > self.bundle.latest_version {
            return Err(invalid_declaration(&format!(
                "Version {} of '{}' is above the latest version {}",
                version,
                shape.name(),
                self.bundle.latest_version
            )));
        }
        if self.bundle.shapes.contains_key(&version) {
            return Err(invalid_declaration(&format!(
                "Version {} of '{}' is declared twice",
                version,
                shape.name()
            )));
        }

        let mut builder = VersionBuilder::new(version);
        block(&mut builder);
        if let Some(error) = builder.error {
            return Err(error);
        }

        self.bundle.shapes.insert(version, shape.clone());
        for (latest_name, record) in builder.renames {
            self.bundle.renames.append(&latest_name, record);
        }
        if let Some(milestone) = builder.milestone {
            self.bundle.milestones.insert(version, milestone);
        }
        Ok(())
    }
}

fn invalid_declaration(message: &str) -> RowshapeError {
    log::error!("{}", message);
    RowshapeError::new(message, ErrorKind::InvalidOperation)
}

/// Collects the renames and the milestone of one version.
pub struct VersionBuilder {
    version: u32,
    renames: Vec<(String, RenameRecord)>,
    milestone: Option<Milestone>,
    error: Option<RowshapeError>,
}

impl VersionBuilder {
    fn new(version: u32) -> Self {
        VersionBuilder {
            version,
            renames: Vec::new(),
            milestone: None,
            error: None,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn rename<F: FnOnce(&mut RenameBuilder)>(&mut self, block: F) -> &mut Self {
        let mut builder = RenameBuilder {
            version: self.version,
            records: Vec::new(),
        };
        block(&mut builder);

        for (latest_name, record) in builder.records {
            if self.error.is_some() {
                break;
            }
            if self.renames.iter().any(|(name, _)| *name == latest_name) {
                log::error!(
                    "Field '{}' is renamed more than once at version {}",
                    latest_name,
                    self.version
                );
                self.error = Some(RowshapeError::new(
                    &format!(
                        "Field '{}' is renamed more than once at version {}",
                        latest_name, self.version
                    ),
                    ErrorKind::DuplicateRename,
                ));
                break;
            }
            self.renames.push((latest_name, record));
        }
        self
    }

    /// Sets the milestone of this version, replacing an earlier one.
    pub fn milestone<F: FnOnce(&mut MilestoneBuilder)>(&mut self, block: F) -> &mut Self {
        let mut builder = MilestoneBuilder {
            milestone: Milestone::default(),
        };
        block(&mut builder);
        self.milestone = Some(builder.milestone);
        self
    }
}

/// Rename declarations of one version.
pub struct RenameBuilder {
    version: u32,
    records: Vec<(String, RenameRecord)>,
}

impl RenameBuilder {
    /// Starts a rename of the field called `latest_name` in the latest shape.
    pub fn field<N: AsRef<str>>(&mut self, latest_name: N) -> PartialRename<'_> {
        PartialRename {
            builder: self,
            latest_name: latest_name.as_ref().to_string(),
            from: None,
        }
    }
}

pub struct PartialRename<'a> {
    builder: &'a mut RenameBuilder,
    latest_name: String,
    from: Option<String>,
}

impl PartialRename<'_> {
    pub fn from(mut self, old: &str) -> Self {
        self.from = Some(old.to_string());
        self
    }

    /// Records the rename. Without a `from` the field's latest name is
    /// taken as the old name.
    pub fn to(self, new: &str) {
        let from = self.from.unwrap_or_else(|| self.latest_name.clone());
        let record = RenameRecord::new(self.builder.version, &from, new);
        self.builder.records.push((self.latest_name, record));
    }
}

/// Field overrides and finalizer of one milestone.
pub struct MilestoneBuilder {
    milestone: Milestone,
}

impl MilestoneBuilder {
    /// Registers the value conversion for `field`, named as in this
    /// version's shape.
    pub fn modify<N, F>(&mut self, field: N, block: F) -> &mut Self
    where
        N: AsRef<str>,
        F: FnOnce(&mut FieldOverride),
    {
        let mut field_override = FieldOverride::new();
        block(&mut field_override);
        self.milestone
            .overrides
            .insert(field.as_ref().to_string(), field_override);
        self
    }

    /// Receives the record read under the previous shape and the record
    /// built for this version, and returns the record to persist.
    pub fn finalize<F>(&mut self, finalizer: F) -> &mut Self
    where
        F: Fn(&Record, Record) -> RowshapeResult<Record> + Send + Sync + 'static,
    {
        self.milestone.finalizer = Some(Arc::new(finalizer));
        self
    }

    /// [MilestoneBuilder::finalize] over entity types. `Old` must match the
    /// previous step's shape and `New` this version's shape.
    pub fn finalize_typed<Old, New, F>(&mut self, finalizer: F) -> &mut Self
    where
        Old: Entity,
        New: Entity,
        F: Fn(Old, New) -> New + Send + Sync + 'static,
    {
        self.finalize(move |old, new| {
            let old = Old::from_record(old)?;
            let new = New::from_record(&new)?;
            Ok(finalizer(old, new).to_record())
        })
    }
}

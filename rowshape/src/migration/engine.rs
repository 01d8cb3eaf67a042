use crate::common::Value;
use crate::errors::{ErrorKind, RowshapeError, RowshapeResult};
use crate::mapper::{record_from_row, row_from_record, EntityDescriptor, FieldDescriptor, IdMode, Record};
use crate::migration::{MigrationBundle, Milestone};
use crate::query::{select, ID_COLUMN};
use crate::rowshape_config::{RowFailurePolicy, RowshapeConfig};
use crate::store::{SqlExecutor, TableImage};
use std::collections::HashMap;

/// Outcome of migrating one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MigrationReport {
    pub table: String,
    pub from_version: u32,
    pub to_version: u32,
    /// Versions stepped through, in order.
    pub steps: Vec<u32>,
    pub rows_read: usize,
    /// Rows written, summed over every rewrite of the table.
    pub rows_written: usize,
    pub rows_skipped: usize,
}

impl MigrationReport {
    pub(crate) fn unchanged(table: &str, version: u32) -> Self {
        MigrationReport {
            table: table.to_string(),
            from_version: version,
            to_version: version,
            ..Default::default()
        }
    }

    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Rewrites the rows of a table from a stored version to the latest one.
///
/// Rows are read once under the stored shape, then carried through every
/// declared version up to the latest in memory. Only when every step has
/// been converted are the results written, in one
/// [rewrite_table](crate::store::SqlExecutorProvider::rewrite_table) call:
/// with `write_each_step` the table is re-laid-out and rewritten once per
/// step, otherwise only for the last. Either way the final rows are the
/// same, so migrating `1 -> 3` equals migrating `1 -> 2` and then `2 -> 3`.
/// A failure before or during the write leaves the table as it was.
///
/// The engine does not lock and does not touch the version table; see
/// [DbMigrator](crate::migration::DbMigrator) for both.
#[derive(Clone)]
pub struct MigrationEngine {
    executor: SqlExecutor,
    config: RowshapeConfig,
}

impl MigrationEngine {
    pub fn new(executor: SqlExecutor, config: RowshapeConfig) -> Self {
        MigrationEngine { executor, config }
    }

    pub fn migrate(
        &self,
        table: &str,
        stored_version: u32,
        bundle: &MigrationBundle,
    ) -> RowshapeResult<MigrationReport> {
        let latest_version = bundle.latest_version();
        if stored_version == latest_version {
            log::debug!("Table '{}' is already at version {}", table, latest_version);
            return Ok(MigrationReport::unchanged(table, stored_version));
        }
        if stored_version > latest_version {
            log::warn!(
                "Table '{}' is at version {}, newer than {}; downgrades are not supported",
                table,
                stored_version,
                latest_version
            );
            return Ok(MigrationReport::unchanged(table, stored_version));
        }

        let steps = bundle.steps_between(stored_version, latest_version);
        let read_shape = bundle.shape(stored_version)?;
        for step in &steps {
            bundle.shape(*step)?;
        }

        log::debug!(
            "Migrating table '{}' from version {} to {} via {:?}",
            table,
            stored_version,
            latest_version,
            steps
        );

        let mut report = MigrationReport {
            table: table.to_string(),
            from_version: stored_version,
            to_version: latest_version,
            steps: steps.clone(),
            ..Default::default()
        };

        let mut records = self.read_records(table, stored_version, read_shape, &mut report)?;
        let write_each_step = self.config.write_each_step();

        // Every step is converted and turned into rows before the table is
        // touched, so a failing row leaves the stored data as it was.
        let mut images = Vec::new();
        let mut previous = stored_version;
        for (index, step) in steps.iter().enumerate() {
            let from = bundle.shape(previous)?;
            let to = bundle.shape(*step)?;
            let renames = bundle.renames().rename_snapshot(previous, *step);
            let milestone = bundle.milestone(*step);

            let mut converted = Vec::with_capacity(records.len());
            for record in &records {
                match convert_record(record, from, to, &renames, milestone) {
                    Ok(record) => converted.push(record),
                    Err(error) => self.handle_row_failure(table, *step, record, error, &mut report)?,
                }
            }
            records = converted;

            let last_step = index + 1 == steps.len();
            if write_each_step || last_step {
                images.push(self.table_image(table, *step, to, &mut records, &mut report)?);
            }
            log::debug!(
                "Table '{}' reached version {} with {} rows",
                table,
                step,
                records.len()
            );
            previous = *step;
        }

        report.rows_written = self.executor.rewrite_table(table, &images)?;
        log::debug!(
            "Migrated table '{}': {} read, {} written, {} skipped",
            table,
            report.rows_read,
            report.rows_written,
            report.rows_skipped
        );
        Ok(report)
    }

    fn read_records(
        &self,
        table: &str,
        version: u32,
        shape: &EntityDescriptor,
        report: &mut MigrationReport,
    ) -> RowshapeResult<Vec<Record>> {
        let query = select(table, &[], |q| {
            q.order_by_id();
        });
        let rows = self.executor.query_built(&query)?;
        report.rows_read = rows.len();

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            match record_from_row(shape, row) {
                Ok(record) => records.push(record),
                Err(error) => {
                    let id = row.get(ID_COLUMN).cloned().unwrap_or(Value::Null);
                    let record = crate::record! { ID_COLUMN => id };
                    self.handle_row_failure(table, version, &record, error, report)?;
                }
            }
        }
        Ok(records)
    }

    /// Lays `records` out as rows of `shape`. Records that cannot be laid
    /// out go through the row failure policy and are dropped from `records`.
    fn table_image(
        &self,
        table: &str,
        step: u32,
        shape: &EntityDescriptor,
        records: &mut Vec<Record>,
        report: &mut MigrationReport,
    ) -> RowshapeResult<TableImage> {
        let mut rows = Vec::with_capacity(records.len());
        let mut kept = Vec::with_capacity(records.len());
        for record in records.drain(..) {
            match row_from_record(shape, &record, IdMode::Include) {
                Ok(row) => {
                    rows.push(row);
                    kept.push(record);
                }
                Err(error) => self.handle_row_failure(table, step, &record, error, report)?,
            }
        }
        *records = kept;
        Ok(TableImage::new(shape.columns(), rows))
    }

    fn handle_row_failure(
        &self,
        table: &str,
        step: u32,
        record: &Record,
        error: RowshapeError,
        report: &mut MigrationReport,
    ) -> RowshapeResult<()> {
        let id = record.get(ID_COLUMN).cloned().unwrap_or(Value::Null);
        match self.config.row_failure_policy() {
            RowFailurePolicy::SkipRow => {
                log::warn!(
                    "Skipping row {} of '{}' at version {}: {}",
                    id,
                    table,
                    step,
                    error
                );
                report.rows_skipped += 1;
                Ok(())
            }
            RowFailurePolicy::Abort => {
                log::error!("Migration of '{}' aborted at row {}: {}", table, id, error);
                Err(RowshapeError::new_with_cause(
                    &format!("Migration of '{}' aborted at row {}", table, id),
                    ErrorKind::MigrationError,
                    error,
                ))
            }
        }
    }
}

/// Carries one record from shape `from` to shape `to`.
///
/// `renames` maps field names in `to` to their names in `from`. For each
/// field of `to` the value is taken from the milestone override if it
/// produces one, else from the same-named source field converted to the
/// target kind, else from the field default. The milestone finalizer, if
/// any, then combines the source record with the result.
pub fn convert_record(
    record: &Record,
    from: &EntityDescriptor,
    to: &EntityDescriptor,
    renames: &HashMap<String, String>,
    milestone: Option<&Milestone>,
) -> RowshapeResult<Record> {
    let mut converted = Record::new();
    for field in to.fields() {
        let source_name = renames
            .get(field.name())
            .map(String::as_str)
            .unwrap_or(field.name());
        let source = record.get(source_name);

        let from_override = milestone
            .and_then(|m| m.override_for(field.name()))
            .and_then(|o| o.apply(source))
            .and_then(|v| fit(&v, field));
        let value = match from_override {
            Some(value) => value,
            None => match source.and_then(|v| fit(v, field)) {
                Some(value) => value,
                None => default_for(to, from, field)?,
            },
        };
        converted.put(field.name(), value);
    }

    match milestone {
        Some(milestone) => milestone.finalize(record, converted),
        None => Ok(converted),
    }
}

/// Runs [convert_record] for every step in `steps`, starting from a record
/// of `from_version`.
pub fn convert_through_steps(
    record: &Record,
    from_version: u32,
    steps: &[u32],
    bundle: &MigrationBundle,
) -> RowshapeResult<Record> {
    let mut current = record.clone();
    let mut previous = from_version;
    for step in steps {
        let renames = bundle.renames().rename_snapshot(previous, *step);
        current = convert_record(
            &current,
            bundle.shape(previous)?,
            bundle.shape(*step)?,
            &renames,
            bundle.milestone(*step),
        )?;
        previous = *step;
    }
    Ok(current)
}

/// Converts `value` to what `field` can hold, or `None` if it cannot.
fn fit(value: &Value, field: &FieldDescriptor) -> Option<Value> {
    match (value, field.list_len()) {
        (Value::Null, _) if field.is_nullable() => Some(Value::Null),
        (Value::Null, _) => None,
        (Value::List(items), Some(len)) => {
            let mut fitted = Vec::with_capacity(len);
            for index in 0..len {
                let item = match items.get(index).and_then(|v| v.coerce_to(field.kind())) {
                    Some(item) => item,
                    None => field.element_default(index)?.clone(),
                };
                fitted.push(item);
            }
            Some(Value::List(fitted))
        }
        (Value::List(_), None) | (_, Some(_)) => None,
        (value, None) => value.coerce_to(field.kind()),
    }
}

fn default_for(
    to: &EntityDescriptor,
    from: &EntityDescriptor,
    field: &FieldDescriptor,
) -> RowshapeResult<Value> {
    field.default_value().cloned().ok_or_else(|| {
        log::error!(
            "Field '{}' of '{}' has no source in '{}' and no default",
            field.name(),
            to.name(),
            from.name()
        );
        RowshapeError::new(
            &format!(
                "Field '{}' of '{}' has no source value and no default",
                field.name(),
                to.name()
            ),
            ErrorKind::MissingField,
        )
    })
}

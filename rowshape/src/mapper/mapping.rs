use crate::common::{ColumnKind, Value};
use crate::errors::{ErrorKind, RowshapeError, RowshapeResult};
use crate::mapper::{EntityDescriptor, FieldDescriptor, Record, Row};

/// Whether the `id` column is written when a record becomes a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdMode {
    /// Write the record's id, used when rows are rewritten in place.
    Include,
    /// Leave `id` out so the database assigns one on insert.
    Skip,
}

/// Reads a row under `descriptor` into a record.
///
/// A column missing from the row falls back to the field default, and is a
/// `MissingField` error without one. A `NULL` column stays `Null` for a
/// nullable field. Stored values are converted to the declared kind through
/// the automatic conversion table.
pub fn record_from_row(descriptor: &EntityDescriptor, row: &Row) -> RowshapeResult<Record> {
    let mut record = Record::new();
    for field in descriptor.fields() {
        let value = if field.is_list() {
            read_list(descriptor, field, row)?
        } else {
            read_scalar(descriptor, field, row)?
        };
        record.put(field.name(), value);
    }
    Ok(record)
}

fn read_scalar(
    descriptor: &EntityDescriptor,
    field: &FieldDescriptor,
    row: &Row,
) -> RowshapeResult<Value> {
    match row.get(field.name()) {
        Some(value) => decode(descriptor, field.name(), field, value),
        None => field
            .default_value()
            .cloned()
            .ok_or_else(|| missing_field(descriptor, field.name())),
    }
}

fn read_list(
    descriptor: &EntityDescriptor,
    field: &FieldDescriptor,
    row: &Row,
) -> RowshapeResult<Value> {
    let mut items = Vec::with_capacity(field.list_len().unwrap_or_default());
    for (index, column) in field.column_names().iter().enumerate() {
        let item = match row.get(column) {
            Some(value) => decode(descriptor, column, field, value)?,
            None => field
                .element_default(index)
                .cloned()
                .ok_or_else(|| missing_field(descriptor, column))?,
        };
        items.push(item);
    }
    Ok(Value::List(items))
}

fn decode(
    descriptor: &EntityDescriptor,
    column: &str,
    field: &FieldDescriptor,
    value: &Value,
) -> RowshapeResult<Value> {
    if value.is_null() {
        return if field.is_nullable() {
            Ok(Value::Null)
        } else {
            Err(invalid_data(descriptor, column, value, field.kind()))
        };
    }
    value
        .coerce_to(field.kind())
        .ok_or_else(|| invalid_data(descriptor, column, value, field.kind()))
}

/// Writes a record under `descriptor` as a row, expanding list fields into
/// their numbered columns.
///
/// A field absent from the record takes its default. `id` is written only
/// with [IdMode::Include].
pub fn row_from_record(
    descriptor: &EntityDescriptor,
    record: &Record,
    id_mode: IdMode,
) -> RowshapeResult<Row> {
    let mut row = Row::new();
    for field in descriptor.fields() {
        if field.is_id() && id_mode == IdMode::Skip {
            continue;
        }

        let value = match record.get(field.name()) {
            Some(value) => value,
            None => field
                .default_value()
                .ok_or_else(|| missing_field(descriptor, field.name()))?,
        };

        if field.is_list() {
            let columns = field.column_names();
            let items = match value {
                Value::List(items) if items.len() == columns.len() => items,
                other => {
                    log::error!(
                        "Field '{}' of '{}' expects a list of {} values, got {}",
                        field.name(),
                        descriptor.name(),
                        columns.len(),
                        other
                    );
                    return Err(RowshapeError::new(
                        &format!(
                            "Field '{}' of '{}' expects a list of {} values",
                            field.name(),
                            descriptor.name(),
                            columns.len()
                        ),
                        ErrorKind::InvalidDataType,
                    ));
                }
            };
            for (column, item) in columns.into_iter().zip(items) {
                let encoded = decode(descriptor, &column, field, item)?;
                row.insert(column, encoded);
            }
        } else {
            let encoded = decode(descriptor, field.name(), field, value)?;
            row.insert(field.name().to_string(), encoded);
        }
    }
    Ok(row)
}

fn missing_field(descriptor: &EntityDescriptor, column: &str) -> RowshapeError {
    log::error!(
        "Column '{}' of '{}' is missing and has no default",
        column,
        descriptor.name()
    );
    RowshapeError::new(
        &format!(
            "Column '{}' of '{}' is missing and has no default",
            column,
            descriptor.name()
        ),
        ErrorKind::MissingField,
    )
}

fn invalid_data(
    descriptor: &EntityDescriptor,
    column: &str,
    value: &Value,
    kind: ColumnKind,
) -> RowshapeError {
    log::error!(
        "Column '{}' of '{}' holds {}, which is not a valid {}",
        column,
        descriptor.name(),
        value,
        kind
    );
    RowshapeError::new(
        &format!(
            "Column '{}' of '{}' holds {}, which is not a valid {}",
            column,
            descriptor.name(),
            value,
            kind
        ),
        ErrorKind::InvalidDataType,
    )
}

use crate::common::{ColumnDescriptor, ColumnType, FromValue, Value};
use crate::errors::RowshapeResult;
use crate::query::select;
use crate::store::SqlExecutor;

const ENTITY_COLUMN: &str = "entity_name";
const VERSION_COLUMN: &str = "version";
const NOTES_COLUMN: &str = "notes";

/// The table recording which version each entity's rows are shaped as.
///
/// One row per entity: `id`, `entity_name` (a unique key), `version` and
/// free-form `notes`.
#[derive(Clone)]
pub struct VersionTable {
    executor: SqlExecutor,
    table: String,
}

impl VersionTable {
    pub fn new(executor: SqlExecutor, table: &str) -> Self {
        VersionTable {
            executor,
            table: table.to_string(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("id", ColumnType::Id, false),
            ColumnDescriptor::new(ENTITY_COLUMN, ColumnType::Str, false).unique(),
            ColumnDescriptor::new(VERSION_COLUMN, ColumnType::Int, false),
            ColumnDescriptor::new(NOTES_COLUMN, ColumnType::Str, false),
        ]
    }

    /// Creates the table if it does not exist yet.
    pub fn ensure(&self) -> RowshapeResult<()> {
        self.executor
            .create_or_alter_columns(&self.table, &Self::columns())
    }

    /// Stored version of `entity`, or `None` if it was never recorded.
    pub fn get(&self, entity: &str) -> RowshapeResult<Option<u32>> {
        let query = select(&self.table, &[VERSION_COLUMN], |q| {
            q.filter(|w| {
                w.eq(ENTITY_COLUMN, entity);
            })
            .limit(1);
        });
        let rows = self.executor.query_built(&query)?;
        match rows.first().and_then(|row| row.get(VERSION_COLUMN)) {
            Some(value) => {
                let version = i64::from_value(value)?;
                Ok(Some(version.max(0) as u32))
            }
            None => Ok(None),
        }
    }

    /// Records `version` for `entity`, updating the existing row or inserting
    /// one. Without `notes` the update time is recorded.
    pub fn set(&self, entity: &str, version: u32, notes: Option<&str>) -> RowshapeResult<()> {
        let notes = match notes {
            Some(notes) => notes.to_string(),
            None => format!("updated {}", chrono::Utc::now().to_rfc3339()),
        };
        let stored = Value::Long(i64::from(version));

        let updated = self.executor.execute(
            &format!(
                "UPDATE {} SET {}=?, {}=? WHERE {}=?",
                self.table, VERSION_COLUMN, NOTES_COLUMN, ENTITY_COLUMN
            ),
            &[stored.clone(), Value::from(&notes), Value::from(entity)],
        )?;
        if updated == 0 {
            self.executor.execute(
                &format!(
                    "INSERT INTO {} ({}, {}, {}) VALUES (?, ?, ?)",
                    self.table, ENTITY_COLUMN, VERSION_COLUMN, NOTES_COLUMN
                ),
                &[Value::from(entity), stored, Value::from(notes)],
            )?;
        }
        log::debug!("Recorded version {} for '{}'", version, entity);
        Ok(())
    }
}

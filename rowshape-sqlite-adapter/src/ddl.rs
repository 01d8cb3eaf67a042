use itertools::Itertools;
use rowshape::common::{ColumnDescriptor, ColumnType};

/// A column as SQLite reports it through `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableColumn {
    pub(crate) name: String,
    pub(crate) declared_type: String,
    pub(crate) not_null: bool,
    pub(crate) primary_key: bool,
}

pub(crate) fn type_name(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Id => "INTEGER",
        ColumnType::Int => "INT",
        ColumnType::Str => "TEXT",
        ColumnType::Bool => "BOOL",
        ColumnType::Long => "BIGINT",
        ColumnType::Float => "REAL",
        ColumnType::Blob => "BLOB",
    }
}

/// `name TYPE [NOT NULL] [UNIQUE]`; the id column becomes the rowid alias.
pub(crate) fn column_sql(column: &ColumnDescriptor) -> String {
    let mut sql = match column.column_type {
        ColumnType::Id => return format!("{} INTEGER NOT NULL PRIMARY KEY", column.name),
        other if column.nullable => format!("{} {}", column.name, type_name(other)),
        other => format!("{} {} NOT NULL", column.name, type_name(other)),
    };
    if column.unique {
        sql.push_str(" UNIQUE");
    }
    sql
}

pub(crate) fn create_table_sql(table: &str, columns: &[ColumnDescriptor]) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        table,
        columns.iter().map(column_sql).join(", ")
    )
}

/// What `PRAGMA table_info` reports for a table created from `columns`.
pub(crate) fn expected_columns(columns: &[ColumnDescriptor]) -> Vec<TableColumn> {
    columns
        .iter()
        .map(|column| TableColumn {
            name: column.name.clone(),
            declared_type: type_name(column.column_type).to_string(),
            not_null: column.column_type == ColumnType::Id || !column.nullable,
            primary_key: column.column_type == ColumnType::Id,
        })
        .collect()
}

/// Copies the columns both layouts share from `from` into `to`. Rows that
/// violate a constraint of the new layout are dropped.
pub(crate) fn copy_rows_sql(from: &str, to: &str, shared: &[&str]) -> String {
    let columns = shared.iter().join(", ");
    format!(
        "INSERT OR IGNORE INTO {} ({}) SELECT {} FROM {}",
        to, columns, columns, from
    )
}

use crate::common::{ColumnDescriptor, ColumnType, Value};
use crate::errors::{ErrorKind, RowshapeError, RowshapeResult};
use crate::mapper::Row;
use crate::query::ID_COLUMN;
use crate::store::{SqlExecutorProvider, TableImage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
struct MockTable {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Row>,
}

#[derive(Default)]
struct MockState {
    tables: HashMap<String, MockTable>,
    statements: Vec<String>,
    fail_rewrites: bool,
}

/// In-memory executor for unit tests. Understands the handful of statement
/// forms the crate itself issues and records every statement it receives.
#[derive(Clone, Default)]
pub(crate) struct MockExecutor {
    state: Arc<Mutex<MockState>>,
}

impl MockExecutor {
    pub(crate) fn new() -> Self {
        MockExecutor::default()
    }

    pub(crate) fn statements(&self) -> Vec<String> {
        self.state.lock().statements.clone()
    }

    pub(crate) fn clear_statements(&self) {
        self.state.lock().statements.clear();
    }

    pub(crate) fn rows(&self, table: &str) -> Vec<Row> {
        self.state
            .lock()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub(crate) fn column_names(&self, table: &str) -> Vec<String> {
        self.state
            .lock()
            .tables
            .get(table)
            .map(|t| t.columns.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Makes every later `rewrite_table` call fail after its last image,
    /// before the result replaces the table.
    pub(crate) fn fail_rewrites(&self) {
        self.state.lock().fail_rewrites = true;
    }

    /// Seeds a table with rows without recording statements.
    pub(crate) fn seed(&self, table: &str, columns: &[ColumnDescriptor], rows: Vec<Row>) {
        let mut state = self.state.lock();
        state.tables.insert(
            table.to_string(),
            MockTable {
                columns: columns.to_vec(),
                rows,
            },
        );
    }
}

fn unsupported(sql: &str) -> RowshapeError {
    RowshapeError::new(
        &format!("Mock executor cannot run '{}'", sql),
        ErrorKind::BackendError,
    )
}

fn no_table(table: &str) -> RowshapeError {
    RowshapeError::new(&format!("no such table: {}", table), ErrorKind::BackendError)
}

fn list_between<'a>(text: &'a str, open: char, close: char) -> Option<Vec<&'a str>> {
    let start = text.find(open)? + 1;
    let end = start + text[start..].find(close)?;
    Some(text[start..end].split(',').map(str::trim).collect())
}

fn matches(row: &Row, column: &str, arg: &Value) -> bool {
    row.get(column)
        .is_some_and(|v| v.to_arg_string() == arg.to_arg_string())
}

impl SqlExecutorProvider for MockExecutor {
    fn execute(&self, sql: &str, args: &[Value]) -> RowshapeResult<usize> {
        let mut state = self.state.lock();
        state.statements.push(sql.to_string());

        if let Some(table) = sql.strip_prefix("DELETE FROM ") {
            let table = state.tables.get_mut(table.trim()).ok_or_else(|| no_table(table))?;
            let count = table.rows.len();
            table.rows.clear();
            return Ok(count);
        }

        if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            let name = rest.split_whitespace().next().ok_or_else(|| unsupported(sql))?;
            let columns = list_between(rest, '(', ')').ok_or_else(|| unsupported(sql))?;
            let table = state.tables.get_mut(name).ok_or_else(|| no_table(name))?;
            let next_id = table
                .rows
                .iter()
                .filter_map(|r| match r.get(ID_COLUMN) {
                    Some(Value::Long(id)) => Some(*id),
                    Some(Value::Int(id)) => Some(i64::from(*id)),
                    _ => None,
                })
                .max()
                .unwrap_or(0)
                + 1;

            let mut row = Row::new();
            for column in &table.columns {
                let value = match columns.iter().position(|c| *c == column.name) {
                    Some(index) => args.get(index).cloned().unwrap_or(Value::Null),
                    None if column.column_type == ColumnType::Id => Value::Long(next_id),
                    None => Value::Null,
                };
                row.insert(column.name.clone(), value);
            }
            table.rows.push(row);
            return Ok(1);
        }

        if let Some(rest) = sql.strip_prefix("UPDATE ") {
            let name = rest.split_whitespace().next().ok_or_else(|| unsupported(sql))?;
            let (set_part, where_part) = rest.split_once(" WHERE ").ok_or_else(|| unsupported(sql))?;
            let set_columns: Vec<&str> = set_part
                .split_once(" SET ")
                .ok_or_else(|| unsupported(sql))?
                .1
                .split(',')
                .map(|c| c.trim().trim_end_matches("=?"))
                .collect();
            let where_column = where_part.trim().trim_end_matches("=?");
            let where_arg = args.get(set_columns.len()).ok_or_else(|| unsupported(sql))?;

            let table = state.tables.get_mut(name).ok_or_else(|| no_table(name))?;
            let mut count = 0;
            for row in table.rows.iter_mut().filter(|r| matches(r, where_column, where_arg)) {
                for (column, value) in set_columns.iter().zip(args) {
                    row.insert(column.to_string(), value.clone());
                }
                count += 1;
            }
            return Ok(count);
        }

        Err(unsupported(sql))
    }

    fn query(&self, sql: &str, args: &[Value]) -> RowshapeResult<Vec<Row>> {
        let mut state = self.state.lock();
        state.statements.push(sql.to_string());

        let rest = sql.strip_prefix("SELECT ").ok_or_else(|| unsupported(sql))?;
        let (columns, rest) = rest.split_once(" FROM ").ok_or_else(|| unsupported(sql))?;
        let name = rest.split_whitespace().next().ok_or_else(|| unsupported(sql))?;
        let table = state.tables.get(name).ok_or_else(|| no_table(name))?;

        let mut rows: Vec<Row> = match rest.split_once(" WHERE ") {
            Some((_, clause)) => {
                let column = clause.split('=').next().unwrap_or_default().trim();
                let arg = args.first().ok_or_else(|| unsupported(sql))?;
                table
                    .rows
                    .iter()
                    .filter(|r| matches(r, column, arg))
                    .cloned()
                    .collect()
            }
            None => table.rows.clone(),
        };

        if columns.trim() != "*" {
            let wanted: Vec<&str> = columns.split(',').map(str::trim).collect();
            rows = rows
                .into_iter()
                .map(|row| {
                    wanted
                        .iter()
                        .map(|c| (c.to_string(), row.get(*c).cloned().unwrap_or(Value::Null)))
                        .collect()
                })
                .collect();
        }
        Ok(rows)
    }

    fn table_exists(&self, table: &str) -> RowshapeResult<bool> {
        Ok(self.state.lock().tables.contains_key(table))
    }

    fn create_or_alter_columns(&self, table: &str, columns: &[ColumnDescriptor]) -> RowshapeResult<()> {
        let mut state = self.state.lock();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        state
            .statements
            .push(format!("LAYOUT {} ({})", table, names.join(", ")));

        let entry = state.tables.entry(table.to_string()).or_default();
        if entry.columns != columns {
            entry.rows = entry
                .rows
                .iter()
                .map(|row| {
                    columns
                        .iter()
                        .map(|c| (c.name.clone(), row.get(&c.name).cloned().unwrap_or(Value::Null)))
                        .collect()
                })
                .collect();
            entry.columns = columns.to_vec();
        }
        Ok(())
    }

    fn rewrite_table(&self, table: &str, images: &[TableImage]) -> RowshapeResult<usize> {
        let mut state = self.state.lock();
        let mut scratch = state.tables.get(table).cloned().unwrap_or_default();
        let mut written = 0;
        for image in images {
            let names: Vec<&str> = image.columns.iter().map(|c| c.name.as_str()).collect();
            state
                .statements
                .push(format!("REWRITE {} ({}) {}", table, names.join(", "), image.rows.len()));
            scratch.columns = image.columns.clone();
            scratch.rows = image
                .rows
                .iter()
                .map(|row| {
                    image
                        .columns
                        .iter()
                        .map(|c| (c.name.clone(), row.get(&c.name).cloned().unwrap_or(Value::Null)))
                        .collect()
                })
                .collect();
            written += image.rows.len();
        }
        if state.fail_rewrites {
            return Err(RowshapeError::new(
                &format!("Mock rewrite of {} failed", table),
                ErrorKind::BackendError,
            ));
        }
        state.tables.insert(table.to_string(), scratch);
        Ok(written)
    }
}

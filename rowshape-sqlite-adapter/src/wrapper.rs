use rowshape::common::Value;
use rowshape::errors::{ErrorKind, RowshapeError};
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use thiserror::Error;

/// Errors raised inside the SQLite adapter before they cross into rowshape.
#[derive(Error, Debug)]
pub enum SqliteAdapterError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A value with no SQLite representation, e.g. an unexpanded list
    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),
    #[error("Invalid UTF-8 in text column: {0}")]
    InvalidUtf8(String),
}

impl From<SqliteAdapterError> for RowshapeError {
    fn from(err: SqliteAdapterError) -> Self {
        let kind = match err {
            SqliteAdapterError::Sqlite(_) => ErrorKind::BackendError,
            SqliteAdapterError::UnsupportedValue(_) | SqliteAdapterError::InvalidUtf8(_) => {
                ErrorKind::InvalidDataType
            }
        };
        log::error!("{}", err);
        RowshapeError::new(&err.to_string(), kind)
    }
}

pub type SqliteAdapterResult<T> = Result<T, SqliteAdapterError>;

/// Binds a rowshape [Value] as a statement parameter.
pub(crate) struct SqlValue<'a>(pub(crate) &'a Value);

impl ToSql for SqlValue<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self.0 {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Int(v) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(i64::from(*v))),
            Value::Long(v) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*v)),
            Value::Float(v) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*v)),
            Value::Bool(v) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(i64::from(*v))),
            Value::Str(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Value::Blob(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
            Value::List(_) => {
                return Err(rusqlite::Error::ToSqlConversionFailure(Box::new(
                    SqliteAdapterError::UnsupportedValue(self.0.to_string()),
                )))
            }
        };
        Ok(value)
    }
}

/// Reads a column value. Integers come back as `Long`; the mapper narrows
/// them to the field kind.
pub(crate) fn value_from_ref(value: ValueRef<'_>) -> SqliteAdapterResult<Value> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(v) => Ok(Value::Long(v)),
        ValueRef::Real(v) => Ok(Value::Float(v)),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|s| Value::Str(s.to_string()))
            .map_err(|e| SqliteAdapterError::InvalidUtf8(e.to_string())),
        ValueRef::Blob(bytes) => Ok(Value::Blob(bytes.to_vec())),
    }
}

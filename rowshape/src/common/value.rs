use crate::common::ColumnKind;
use crate::errors::{ErrorKind, RowshapeError, RowshapeResult};
use itertools::Itertools;
use std::fmt::{Debug, Display, Formatter};

/// A single stored value.
///
/// The variants mirror the scalar kinds a column can hold, plus `List` for
/// the values of a fixed-size list field before it is spread over numbered
/// columns. Migration transforms dispatch on the variant of the raw value.
///
/// # Examples
///
/// ```rust
/// use rowshape::common::Value;
///
/// let v = Value::from(42);
/// assert_eq!(v.to_arg_string(), "42");
/// assert_eq!(Value::from(true).to_arg_string(), "1");
/// ```
#[derive(Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Null,
    Int(i32),
    Long(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Blob(Vec<u8>),
    List(Vec<Value>),
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "\"{}\"", v),
            Value::Blob(v) => write!(f, "<{} bytes>", v.len()),
            Value::List(v) => write!(f, "[{}]", v.iter().join(", ")),
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Long(_) | Value::Float(_))
    }

    /// Returns the column kind this value naturally belongs to, or `None`
    /// for `Null` and `List`.
    pub fn kind(&self) -> Option<ColumnKind> {
        match self {
            Value::Int(_) => Some(ColumnKind::Int),
            Value::Long(_) => Some(ColumnKind::Long),
            Value::Float(_) => Some(ColumnKind::Float),
            Value::Bool(_) => Some(ColumnKind::Bool),
            Value::Str(_) => Some(ColumnKind::Str),
            Value::Blob(_) => Some(ColumnKind::Blob),
            Value::Null | Value::List(_) => None,
        }
    }

    /// Renders the value as a positional query argument.
    ///
    /// Numbers use their canonical text form, booleans become `"1"` / `"0"`
    /// and strings are passed through verbatim.
    pub fn to_arg_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Int(v) => v.to_string(),
            Value::Long(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Bool(v) => if *v { "1" } else { "0" }.to_string(),
            Value::Str(v) => v.clone(),
            Value::Blob(v) => String::from_utf8_lossy(v).into_owned(),
            Value::List(v) => v.iter().map(Value::to_arg_string).join(","),
        }
    }

    /// Converts the value to `kind` using the automatic conversion table.
    ///
    /// Any number or boolean converts to `Int`, `Long` and `Float` (booleans
    /// as `1` / `0`); numbers convert to `Bool` as `!= 0`. Strings and blobs
    /// only convert to themselves. Returns `None` when no conversion exists.
    pub fn coerce_to(&self, kind: ColumnKind) -> Option<Value> {
        match kind {
            ColumnKind::Int => match self {
                Value::Int(v) => Some(Value::Int(*v)),
                Value::Long(v) => Some(Value::Int(*v as i32)),
                Value::Float(v) => Some(Value::Int(*v as i32)),
                Value::Bool(v) => Some(Value::Int(i32::from(*v))),
                _ => None,
            },
            ColumnKind::Long => match self {
                Value::Int(v) => Some(Value::Long(i64::from(*v))),
                Value::Long(v) => Some(Value::Long(*v)),
                Value::Float(v) => Some(Value::Long(*v as i64)),
                Value::Bool(v) => Some(Value::Long(i64::from(*v))),
                _ => None,
            },
            ColumnKind::Float => match self {
                Value::Int(v) => Some(Value::Float(f64::from(*v))),
                Value::Long(v) => Some(Value::Float(*v as f64)),
                Value::Float(v) => Some(Value::Float(*v)),
                Value::Bool(v) => Some(Value::Float(if *v { 1.0 } else { 0.0 })),
                _ => None,
            },
            ColumnKind::Bool => match self {
                Value::Bool(v) => Some(Value::Bool(*v)),
                Value::Int(v) => Some(Value::Bool(*v != 0)),
                Value::Long(v) => Some(Value::Bool(*v != 0)),
                Value::Float(v) => Some(Value::Bool(*v != 0.0)),
                _ => None,
            },
            ColumnKind::Str => match self {
                Value::Str(v) => Some(Value::Str(v.clone())),
                _ => None,
            },
            ColumnKind::Blob => match self {
                Value::Blob(v) => Some(Value::Blob(v.clone())),
                _ => None,
            },
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    i32 => Int,
    i16 => Int,
    u16 => Int,
    i64 => Long,
    u32 => Long,
    f64 => Float,
    f32 => Float,
    bool => Bool,
    String => Str,
    Vec<u8> => Blob,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Str(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// Conversion from a stored [Value] back into a Rust field type.
///
/// Implemented for the scalar types an entity field may use. Numeric
/// targets accept any value the automatic conversion table allows.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> RowshapeResult<Self>;
}

fn mismatch(value: &Value, expected: &str) -> RowshapeError {
    log::error!("Cannot read {} as {}", value, expected);
    RowshapeError::new(
        &format!("Cannot read {} as {}", value, expected),
        ErrorKind::InvalidDataType,
    )
}

macro_rules! from_value_via_kind {
    ($ty:ty, $kind:expr, $variant:ident, $name:literal) => {
        impl FromValue for $ty {
            fn from_value(value: &Value) -> RowshapeResult<Self> {
                match value.coerce_to($kind) {
                    Some(Value::$variant(v)) => Ok(v as $ty),
                    _ => Err(mismatch(value, $name)),
                }
            }
        }
    };
}

from_value_via_kind!(i32, ColumnKind::Int, Int, "i32");
from_value_via_kind!(i64, ColumnKind::Long, Long, "i64");
from_value_via_kind!(f64, ColumnKind::Float, Float, "f64");
from_value_via_kind!(f32, ColumnKind::Float, Float, "f32");

impl FromValue for bool {
    fn from_value(value: &Value) -> RowshapeResult<Self> {
        match value.coerce_to(ColumnKind::Bool) {
            Some(Value::Bool(v)) => Ok(v),
            _ => Err(mismatch(value, "bool")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> RowshapeResult<Self> {
        match value {
            Value::Str(v) => Ok(v.clone()),
            _ => Err(mismatch(value, "String")),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> RowshapeResult<Self> {
        match value {
            Value::Blob(v) => Ok(v.clone()),
            _ => Err(mismatch(value, "Vec<u8>")),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> RowshapeResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Reads a fixed-size list out of a `Value::List`.
pub fn list_from_value<T: FromValue, const N: usize>(value: &Value) -> RowshapeResult<[T; N]> {
    let items = match value {
        Value::List(items) => items,
        other => return Err(mismatch(other, "list")),
    };
    let converted = items
        .iter()
        .map(T::from_value)
        .collect::<RowshapeResult<Vec<T>>>()?;
    let len = converted.len();
    <[T; N]>::try_from(converted).map_err(|_| {
        log::error!("List has {} elements, expected {}", len, N);
        RowshapeError::new(
            &format!("List has {} elements, expected {}", len, N),
            ErrorKind::InvalidDataType,
        )
    })
}

use crate::common::Value;
use std::fmt::{Display, Formatter};

/// Scalar kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColumnKind {
    Int,
    Str,
    Bool,
    Long,
    Float,
    Blob,
}

impl ColumnKind {
    /// The empty value of this kind: `0`, `""`, `false`, `0`, `0.0` or an empty blob.
    pub fn default_value(&self) -> Value {
        match self {
            ColumnKind::Int => Value::Int(0),
            ColumnKind::Str => Value::Str(String::new()),
            ColumnKind::Bool => Value::Bool(false),
            ColumnKind::Long => Value::Long(0),
            ColumnKind::Float => Value::Float(0.0),
            ColumnKind::Blob => Value::Blob(Vec::new()),
        }
    }
}

impl Display for ColumnKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnKind::Int => write!(f, "Int"),
            ColumnKind::Str => write!(f, "Str"),
            ColumnKind::Bool => write!(f, "Bool"),
            ColumnKind::Long => write!(f, "Long"),
            ColumnKind::Float => write!(f, "Float"),
            ColumnKind::Blob => write!(f, "Blob"),
        }
    }
}

/// A named, typed column.
///
/// Immutable once constructed. Two columns are equal when their names are
/// equal, which is what rename matching relies on. The default is used when
/// a row predates the column; `required()` removes it.
///
/// # Examples
///
/// ```rust
/// use rowshape::common::{int_col, str_col, ColumnKind, Value};
///
/// let age = int_col("age");
/// assert_eq!(age.kind(), ColumnKind::Int);
/// assert_eq!(age.default_value(), Some(&Value::Int(0)));
///
/// let nick = str_col("nick").nullable();
/// assert!(nick.is_nullable());
/// ```
#[derive(Debug, Clone)]
pub struct TypedColumn {
    name: String,
    kind: ColumnKind,
    nullable: bool,
    default: Option<Value>,
}

impl TypedColumn {
    pub fn new(name: &str, kind: ColumnKind) -> Self {
        TypedColumn {
            name: name.to_string(),
            kind,
            nullable: false,
            default: Some(kind.default_value()),
        }
    }

    /// Marks the column as nullable. A nullable column defaults to `Null`.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self.default = Some(Value::Null);
        self
    }

    pub fn with_default<V: Into<Value>>(mut self, default: V) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Removes the default, so reading a row without this column fails.
    pub fn required(mut self) -> Self {
        self.default = None;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

impl PartialEq for TypedColumn {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TypedColumn {}

impl AsRef<str> for TypedColumn {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

pub fn int_col(name: &str) -> TypedColumn {
    TypedColumn::new(name, ColumnKind::Int)
}

pub fn str_col(name: &str) -> TypedColumn {
    TypedColumn::new(name, ColumnKind::Str)
}

pub fn bool_col(name: &str) -> TypedColumn {
    TypedColumn::new(name, ColumnKind::Bool)
}

pub fn long_col(name: &str) -> TypedColumn {
    TypedColumn::new(name, ColumnKind::Long)
}

pub fn float_col(name: &str) -> TypedColumn {
    TypedColumn::new(name, ColumnKind::Float)
}

pub fn blob_col(name: &str) -> TypedColumn {
    TypedColumn::new(name, ColumnKind::Blob)
}

/// Name of the `index`-th (1-based) column of a list stored under `base`.
#[inline]
pub fn list_column_name(base: &str, index: usize) -> String {
    format!("{}{}", base, index)
}

/// Columns `base1..baseN` for a list of `count` elements of `kind`.
pub fn list_columns(base: &str, kind: ColumnKind, count: usize) -> Vec<TypedColumn> {
    (1..=count)
        .map(|i| TypedColumn::new(&list_column_name(base, i), kind))
        .collect()
}

/// Physical type of a column as handed to the DDL layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Auto-assigned integer primary key
    Id,
    Int,
    Str,
    Bool,
    Long,
    Float,
    Blob,
}

impl From<ColumnKind> for ColumnType {
    fn from(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Int => ColumnType::Int,
            ColumnKind::Str => ColumnType::Str,
            ColumnKind::Bool => ColumnType::Bool,
            ColumnKind::Long => ColumnType::Long,
            ColumnKind::Float => ColumnType::Float,
            ColumnKind::Blob => ColumnType::Blob,
        }
    }
}

/// Column layout entry passed to `create_or_alter_columns`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    /// No two rows may hold the same value in this column.
    pub unique: bool,
}

impl ColumnDescriptor {
    pub fn new(name: &str, column_type: ColumnType, nullable: bool) -> Self {
        ColumnDescriptor {
            name: name.to_string(),
            column_type,
            nullable,
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

impl From<&TypedColumn> for ColumnDescriptor {
    fn from(column: &TypedColumn) -> Self {
        ColumnDescriptor::new(column.name(), column.kind().into(), column.is_nullable())
    }
}

use crate::common::{
    list_column_name, validate_identifier, ColumnDescriptor, ColumnKind, ColumnType, TypedColumn,
    Value,
};
use crate::errors::{ErrorKind, RowshapeError, RowshapeResult};
use crate::query::ID_COLUMN;
use std::collections::HashSet;

/// Suffix marking a fixed-size list field. `tag_list` is stored as `tag1..tagN`.
pub const LIST_SUFFIX: &str = "_list";

/// One persisted field of an entity shape.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    kind: ColumnKind,
    nullable: bool,
    default: Option<Value>,
    list_len: Option<usize>,
}

impl FieldDescriptor {
    /// The auto-assigned integer primary key.
    pub fn id() -> Self {
        FieldDescriptor {
            name: ID_COLUMN.to_string(),
            kind: ColumnKind::Long,
            nullable: false,
            default: None,
            list_len: None,
        }
    }

    pub fn scalar(column: &TypedColumn) -> Self {
        FieldDescriptor {
            name: column.name().to_string(),
            kind: column.kind(),
            nullable: column.is_nullable(),
            default: column.default_value().cloned(),
            list_len: None,
        }
    }

    /// A list field whose element count is the length of `defaults`.
    pub fn list(name: &str, kind: ColumnKind, defaults: Vec<Value>) -> Self {
        FieldDescriptor {
            name: name.to_string(),
            kind,
            nullable: false,
            list_len: Some(defaults.len()),
            default: Some(Value::List(defaults)),
        }
    }

    /// Builds a descriptor from raw parts. Used by generated code, which
    /// checks the field at compile time.
    pub fn from_parts(
        name: &str,
        kind: ColumnKind,
        nullable: bool,
        default: Option<Value>,
        list_len: Option<usize>,
    ) -> Self {
        FieldDescriptor {
            name: name.to_string(),
            kind,
            nullable,
            default,
            list_len,
        }
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

    pub fn is_id(&self) -> bool {
        self.name == ID_COLUMN
    }

    pub fn is_list(&self) -> bool {
        self.list_len.is_some()
    }

    pub fn list_len(&self) -> Option<usize> {
        self.list_len
    }

    /// Column prefix of a list field: the name without [LIST_SUFFIX].
    pub fn list_base(&self) -> &str {
        self.name
            .strip_suffix(LIST_SUFFIX)
            .unwrap_or(self.name.as_str())
    }

    /// Physical column names, in order.
    pub fn column_names(&self) -> Vec<String> {
        match self.list_len {
            Some(len) => (1..=len)
                .map(|i| list_column_name(self.list_base(), i))
                .collect(),
            None => vec![self.name.clone()],
        }
    }

    /// Default for the `index`-th (0-based) element of a list field.
    pub(crate) fn element_default(&self, index: usize) -> Option<&Value> {
        match &self.default {
            Some(Value::List(items)) => items.get(index),
            _ => None,
        }
    }

    fn column_type(&self) -> ColumnType {
        if self.is_id() {
            ColumnType::Id
        } else {
            self.kind.into()
        }
    }
}

/// The ordered field list of an entity at one schema version.
///
/// Computed once per shape and then only read. Scalar fields come first,
/// list fields last, so that each list occupies a contiguous column range
/// after the scalar columns. Fields of types that cannot be stored are kept
/// by name in `skipped` and take no part in mapping.
///
/// # Examples
///
/// ```rust
/// use rowshape::common::{str_col, ColumnKind, Value};
/// use rowshape::mapper::EntityDescriptor;
///
/// let thing = EntityDescriptor::builder("Thing")
///     .id()
///     .field(str_col("name"))
///     .list_field("tag_list", ColumnKind::Str, vec![Value::from(""), Value::from("")])
///     .build()
///     .expect("valid shape");
///
/// assert_eq!(thing.column_names(), vec!["id", "name", "tag1", "tag2"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    name: String,
    fields: Vec<FieldDescriptor>,
    skipped: Vec<String>,
}

impl EntityDescriptor {
    pub fn builder(name: &str) -> EntityDescriptorBuilder {
        EntityDescriptorBuilder::new(name)
    }

    /// Assembles a descriptor without validation. Generated code uses this
    /// after checking the shape at compile time; see [EntityDescriptor::validate].
    pub fn from_parts(name: &str, fields: Vec<FieldDescriptor>, skipped: Vec<String>) -> Self {
        EntityDescriptor {
            name: name.to_string(),
            fields,
            skipped,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// All physical column names, list fields expanded.
    pub fn column_names(&self) -> Vec<String> {
        self.fields.iter().flat_map(|f| f.column_names()).collect()
    }

    /// Column layout handed to the DDL layer.
    pub fn columns(&self) -> Vec<ColumnDescriptor> {
        let mut columns = Vec::new();
        for field in &self.fields {
            let column_type = field.column_type();
            for name in field.column_names() {
                columns.push(ColumnDescriptor::new(&name, column_type, field.nullable));
            }
        }
        columns
    }

    /// Checks the shape invariants: a valid entity name, an `id` field,
    /// unique valid field and column names, list fields suffixed with
    /// [LIST_SUFFIX] that come after every scalar field and have a
    /// non-empty default of matching kind.
    pub fn validate(&self) -> RowshapeResult<()> {
        validate_identifier(&self.name, "entity")?;

        if !self.fields.iter().any(|f| f.is_id()) {
            log::error!("Entity '{}' has no '{}' field", self.name, ID_COLUMN);
            return Err(RowshapeError::new(
                &format!("Entity '{}' has no '{}' field", self.name, ID_COLUMN),
                ErrorKind::MissingIdentity,
            ));
        }

        let mut seen_fields = HashSet::new();
        let mut seen_columns = HashSet::new();
        let mut list_started = false;
        for field in &self.fields {
            validate_identifier(&field.name, "field")?;
            if !seen_fields.insert(field.name.as_str()) {
                return Err(invalid_name(&format!(
                    "Field '{}' is declared twice in entity '{}'",
                    field.name, self.name
                )));
            }

            match field.list_len {
                Some(len) => {
                    list_started = true;
                    validate_list_field(&self.name, field, len)?;
                }
                None if list_started => {
                    log::error!(
                        "Scalar field '{}' of entity '{}' follows a list field",
                        field.name,
                        self.name
                    );
                    return Err(RowshapeError::new(
                        &format!(
                            "Scalar field '{}' of entity '{}' follows a list field",
                            field.name, self.name
                        ),
                        ErrorKind::UnsupportedType,
                    ));
                }
                None => {}
            }

            for column in field.column_names() {
                if !seen_columns.insert(column.clone()) {
                    return Err(invalid_name(&format!(
                        "Column '{}' is produced twice in entity '{}'",
                        column, self.name
                    )));
                }
            }
        }
        Ok(())
    }
}

fn validate_list_field(entity: &str, field: &FieldDescriptor, len: usize) -> RowshapeResult<()> {
    if !field.name.ends_with(LIST_SUFFIX) || field.list_base().is_empty() {
        return Err(invalid_name(&format!(
            "List field '{}' of entity '{}' must be named '<base>{}'",
            field.name, entity, LIST_SUFFIX
        )));
    }
    let elements_match = match &field.default {
        Some(Value::List(items)) => {
            items.len() == len && items.iter().all(|v| v.kind() == Some(field.kind))
        }
        _ => false,
    };
    if len == 0 || !elements_match {
        log::error!(
            "List field '{}' of entity '{}' needs a non-empty default of {} values",
            field.name,
            entity,
            field.kind
        );
        return Err(RowshapeError::new(
            &format!(
                "List field '{}' of entity '{}' needs a non-empty default of {} values",
                field.name, entity, field.kind
            ),
            ErrorKind::UnsupportedType,
        ));
    }
    Ok(())
}

fn invalid_name(message: &str) -> RowshapeError {
    log::error!("{}", message);
    RowshapeError::new(message, ErrorKind::InvalidFieldName)
}

/// Fluent builder for [EntityDescriptor]. Fields keep the order they are added in.
pub struct EntityDescriptorBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
    skipped: Vec<String>,
}

impl EntityDescriptorBuilder {
    fn new(name: &str) -> Self {
        EntityDescriptorBuilder {
            name: name.to_string(),
            fields: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn id(mut self) -> Self {
        self.fields.push(FieldDescriptor::id());
        self
    }

    pub fn field(mut self, column: TypedColumn) -> Self {
        self.fields.push(FieldDescriptor::scalar(&column));
        self
    }

    pub fn list_field(mut self, name: &str, kind: ColumnKind, defaults: Vec<Value>) -> Self {
        self.fields.push(FieldDescriptor::list(name, kind, defaults));
        self
    }

    /// Records a field that exists on the type but is never persisted.
    pub fn skip(mut self, name: &str) -> Self {
        self.skipped.push(name.to_string());
        self
    }

    pub fn build(self) -> RowshapeResult<EntityDescriptor> {
        let descriptor = EntityDescriptor {
            name: self.name,
            fields: self.fields,
            skipped: self.skipped,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}

use crate::common::{list_from_value, FromValue, Value};
use crate::errors::{ErrorKind, RowshapeError, RowshapeResult};
use indexmap::IndexMap;

/// A physical database row: column name to value, in column order.
pub type Row = IndexMap<String, Value>;

/// An entity in field form: one entry per logical field, list fields held
/// as a single `Value::List`.
///
/// Records are what migration steps operate on. Field order follows the
/// shape the record was read under.
#[derive(Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    pub fn put<V: Into<Value>>(&mut self, field: &str, value: V) -> &mut Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.shift_remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    /// Reads a field as `T`. A missing field is a `MissingField` error.
    pub fn get_as<T: FromValue>(&self, field: &str) -> RowshapeResult<T> {
        T::from_value(self.require(field)?)
    }

    /// Reads a list field as a fixed-size array.
    pub fn get_list_as<T: FromValue, const N: usize>(&self, field: &str) -> RowshapeResult<[T; N]> {
        list_from_value(self.require(field)?)
    }

    fn require(&self, field: &str) -> RowshapeResult<&Value> {
        self.fields.get(field).ok_or_else(|| {
            log::error!("Field '{}' is not present in the record", field);
            RowshapeError::new(
                &format!("Field '{}' is not present in the record", field),
                ErrorKind::MissingField,
            )
        })
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.fields.iter()).finish()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Record {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Builds a [Record] from `field => value` pairs.
///
/// ```rust
/// use rowshape::record;
///
/// let r = record! { "id" => 1i64, "name" => "a" };
/// assert_eq!(r.get_as::<String>("name").unwrap(), "a");
/// ```
#[macro_export]
macro_rules! record {
    () => { $crate::mapper::Record::new() };
    ($($field:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::mapper::Record::new();
        $( record.put($field, $value); )+
        record
    }};
}

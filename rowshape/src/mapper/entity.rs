use crate::common::{ColumnDescriptor, ColumnKind, FromValue, Value};
use crate::errors::RowshapeResult;
use crate::mapper::{record_from_row, row_from_record, EntityDescriptor, IdMode, Record, Row};

/// A Rust type persisted as one table row per instance.
///
/// Usually derived with `#[derive(Entity)]` from `rowshape_derive`, which
/// builds the descriptor from the struct fields once and caches it.
/// Hand-written implementations must keep `to_record` and `from_record`
/// consistent with `descriptor`.
pub trait Entity: Sized {
    /// Shape of the latest version of this entity.
    fn descriptor() -> &'static EntityDescriptor;

    fn to_record(&self) -> Record;

    fn from_record(record: &Record) -> RowshapeResult<Self>;
}

/// A scalar field type with a fixed column kind.
///
/// The derive macro resolves field kinds through this trait, so explicitly
/// persisting a field of any other type fails to compile.
pub trait FieldType: FromValue + Into<Value> {
    const KIND: ColumnKind;
    const NULLABLE: bool = false;
}

macro_rules! field_type {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl FieldType for $ty {
                const KIND: ColumnKind = ColumnKind::$kind;
            }
        )*
    };
}

field_type!(
    i32 => Int,
    i64 => Long,
    f64 => Float,
    f32 => Float,
    bool => Bool,
    String => Str,
    Vec<u8> => Blob,
);

impl<T: FieldType> FieldType for Option<T> {
    const KIND: ColumnKind = T::KIND;
    const NULLABLE: bool = true;
}

pub fn entity_to_row<E: Entity>(entity: &E, id_mode: IdMode) -> RowshapeResult<Row> {
    row_from_record(E::descriptor(), &entity.to_record(), id_mode)
}

pub fn entity_from_row<E: Entity>(row: &Row) -> RowshapeResult<E> {
    let record = record_from_row(E::descriptor(), row)?;
    E::from_record(&record)
}

/// Column layout of the latest shape of `E`.
pub fn columns_of<E: Entity>() -> Vec<ColumnDescriptor> {
    E::descriptor().columns()
}

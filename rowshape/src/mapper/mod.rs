//! Conversion between typed entities, field records and database rows.
//!
//! An [EntityDescriptor] is computed once per entity shape and then drives
//! every conversion. A [Record] holds one value per field; a [Row] holds one
//! value per column, with list fields spread over numbered columns
//! (`tag_list` becomes `tag1`, `tag2`, ...).

mod descriptor;
mod entity;
mod mapping;
mod record;

pub use descriptor::*;
pub use entity::*;
pub use mapping::*;
pub use record::*;

#![recursion_limit = "128"]
//! # Rowshape Derive Macros
//!
//! ### `Entity`
//!
//! Derives `rowshape::mapper::Entity` for a struct with named fields. The
//! entity descriptor is computed once, on first use, and cached.
//!
//! - The struct must have an `id` field; it maps to the integer primary key.
//! - Fields of type `i32`, `i64`, `f32`, `f64`, `bool`, `String`, `Vec<u8>`
//!   or `Option` of those become columns, in declaration order.
//! - An array field whose name ends in `_list` (`tag_list: [String; 2]`) is a
//!   list field stored in numbered columns (`tag1`, `tag2`). List fields
//!   come after all scalar fields.
//! - Fields of any other type are left out of the row and rebuilt with
//!   `Default::default()`.
//!
//! Attributes:
//!
//! - `#[entity(name = "...")]` on the struct overrides the entity name.
//! - `#[entity(skip)]` leaves a field out.
//! - `#[entity(column)]` persists a field whose type is not recognized by
//!   name, e.g. through a type alias. The type must implement
//!   `rowshape::mapper::FieldType`, otherwise the derive fails to compile.
//! - `#[entity(required)]` drops the default, so a row without the column
//!   fails to map.
//!
//! ```rust,ignore
//! use rowshape_derive::Entity;
//!
//! #[derive(Entity)]
//! #[entity(name = "Thing")]
//! pub struct Thing {
//!     pub id: i64,
//!     #[entity(required)]
//!     pub name: String,
//!     pub note: Option<String>,
//!     pub tag_list: [String; 2],
//!     #[entity(skip)]
//!     pub cache: Vec<String>,
//! }
//! ```

extern crate proc_macro;
mod entity;

use crate::entity::generate_entity_for_struct;
use proc_macro::TokenStream;
use syn::{Data, DeriveInput};

/// Derives the `Entity` trait for row mapping.
///
/// Returns a compile error if the struct has no `id` field, is generic,
/// declares a scalar after a list field, or names a list field without the
/// `_list` suffix while requesting it as a column.
#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as DeriveInput);

    match ast.data {
        Data::Struct(ref data) => match generate_entity_for_struct(&ast, data) {
            Ok(token_stream) => token_stream,
            Err(e) => e.to_compile_error().into(),
        },
        Data::Enum(_) => {
            let error = syn::Error::new_spanned(
                &ast,
                "Cannot derive Entity for enums. Only structs are supported.",
            );
            error.to_compile_error().into()
        }
        Data::Union(_) => {
            let error = syn::Error::new_spanned(
                &ast,
                "Cannot derive Entity for unions. Only structs are supported.",
            );
            error.to_compile_error().into()
        }
    }
}

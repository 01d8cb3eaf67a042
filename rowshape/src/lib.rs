//! # Rowshape - typed rows and stepwise migrations for embedded SQL stores
//!
//! Rowshape sits between plain entity structs and an embedded row-oriented
//! SQL store. It provides:
//!
//! - **Query builders**: composable `WHERE`, `ORDER BY` and `SELECT` builders
//!   that render SQL text plus an ordered argument list
//! - **Mapping**: [`mapper::Entity`] conversion between structs and rows, with
//!   fixed-length list fields spread over numbered columns
//! - **Migration**: a declarative history of entity shapes, column renames and
//!   value transforms, applied one version at a time
//! - **Version table**: the per-entity version record the migrator reads and
//!   writes
//! - **Locking**: one reentrant lock per database, with blocking, detached and
//!   async entry points
//!
//! Storage backends plug in through [`store::SqlExecutorProvider`]; the
//! `rowshape-sqlite-adapter` crate provides one for SQLite.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rowshape::rowshape::Rowshape;
//! use rowshape::migration::EntityMeta;
//! use rowshape_sqlite_adapter::SqliteModule;
//!
//! #[derive(rowshape_derive::Entity)]
//! struct Thing {
//!     id: i64,
//!     name: String,
//!     tag_list: [String; 2],
//! }
//!
//! let db = Rowshape::builder()
//!     .load_module(SqliteModule::with_config().in_memory().build())
//!     .register(EntityMeta::of::<Thing>(1).limited_to_table("Things"))
//!     .open()?;
//!
//! db.insert("Things", &Thing { id: 0, name: "A".into(), tag_list: ["x".into(), "y".into()] })?;
//! let things: Vec<Thing> = db.select_entities("Things", |q| {
//!     q.filter(|w| {
//!         w.eq("name", "A");
//!     });
//! })?;
//! ```
//!
//! ## Module Organization
//!
//! - [`common`] - Values, column kinds, the database lock and name helpers
//! - [`errors`] - Error types and result definitions
//! - [`mapper`] - Entity descriptors, records and row conversion
//! - [`migration`] - Migration DSL, engine, version table and migrator
//! - [`query`] - Predicate, ordering and select builders
//! - [`rowshape`] - The database handle
//! - [`rowshape_builder`] - Handle setup
//! - [`rowshape_config`] - Runtime configuration
//! - [`store`] - The executor boundary backends implement

pub mod common;
pub mod errors;
pub mod mapper;
pub mod migration;
pub mod query;
pub mod rowshape;
pub mod rowshape_builder;
pub mod rowshape_config;
pub mod store;

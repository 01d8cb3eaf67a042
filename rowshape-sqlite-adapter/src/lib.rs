//! SQLite executor for rowshape.
//!
//! [SqliteExecutor] implements the rowshape executor boundary over one
//! `rusqlite` connection; [SqliteModule] plugs it into
//! `Rowshape::builder().load_module(..)`.

mod config;
mod ddl;
mod executor;
mod module;
mod wrapper;

pub use config::*;
pub use executor::*;
pub use module::*;
pub use wrapper::{SqliteAdapterError, SqliteAdapterResult};

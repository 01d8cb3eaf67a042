//! The boundary to the SQL backend.
//!
//! Backends implement [SqlExecutorProvider] and hand it over wrapped in a
//! [SqlExecutor], usually through an [ExecutorModule].

mod executor;
#[cfg(test)]
mod mock;
mod module;

pub use executor::*;
#[cfg(test)]
pub(crate) use mock::*;
pub use module::*;

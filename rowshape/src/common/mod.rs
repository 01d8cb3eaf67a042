//! Building blocks shared by every other module: stored values, typed
//! columns, the database lock and small utilities.

mod column;
mod lock;
pub mod util;
mod value;

pub use column::*;
pub use lock::*;
pub use util::*;
pub use value::*;

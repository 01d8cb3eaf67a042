mod name_utils;
pub(crate) mod task_util;

pub use name_utils::*;
pub use task_util::*;

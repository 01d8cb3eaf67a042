use crate::errors::RowshapeResult;
use crate::store::SqlExecutor;

/// A backend packaged for [RowshapeBuilder::load_module](crate::rowshape_builder::RowshapeBuilder::load_module).
pub trait ExecutorModule {
    fn get_executor(&self) -> RowshapeResult<SqlExecutor>;
}

use crate::errors::{ErrorKind, RowshapeError, RowshapeResult};
use crate::migration::EntityMeta;
use crate::rowshape::Rowshape;
use crate::rowshape_config::{MissingVersion, RowFailurePolicy, RowshapeConfig};
use crate::store::{ExecutorModule, SqlExecutor};

/// Fluent setup of a [Rowshape] handle.
///
/// Each setter records the first error it meets; [RowshapeBuilder::open]
/// returns that error instead of opening.
///
/// ```rust,ignore
/// let db = Rowshape::builder()
///     .load_module(SqliteModule::with_config().in_memory().build())
///     .register(EntityMeta::of::<Thing>(1).limited_to_table("Things"))
///     .open()?;
/// ```
pub struct RowshapeBuilder {
    error: Option<RowshapeError>,
    config: RowshapeConfig,
    executor: Option<SqlExecutor>,
    migrate_on_open: bool,
}

impl Default for RowshapeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RowshapeBuilder {
    pub fn new() -> Self {
        RowshapeBuilder {
            error: None,
            config: RowshapeConfig::new(),
            executor: None,
            migrate_on_open: true,
        }
    }

    fn capture(&mut self, result: RowshapeResult<()>) {
        if self.error.is_none() {
            if let Err(e) = result {
                self.error = Some(e);
            }
        }
    }

    pub fn version_table(mut self, table: &str) -> Self {
        let result = self.config.set_version_table(table);
        self.capture(result);
        self
    }

    pub fn row_failure_policy(mut self, policy: RowFailurePolicy) -> Self {
        let result = self.config.set_row_failure_policy(policy);
        self.capture(result);
        self
    }

    pub fn write_each_step(mut self, enabled: bool) -> Self {
        let result = self.config.set_write_each_step(enabled);
        self.capture(result);
        self
    }

    pub fn missing_version_fallback(mut self, fallback: MissingVersion) -> Self {
        let result = self.config.set_missing_version_fallback(fallback);
        self.capture(result);
        self
    }

    pub fn register(mut self, meta: EntityMeta) -> Self {
        let result = self.config.register_entity(meta);
        self.capture(result);
        self
    }

    /// Whether `open` migrates single-table entities. On by default.
    pub fn migrate_on_open(mut self, enabled: bool) -> Self {
        self.migrate_on_open = enabled;
        self
    }

    pub fn load_module<T: ExecutorModule>(mut self, module: T) -> Self {
        let result = module.get_executor().map(|executor| {
            self.executor = Some(executor);
        });
        self.capture(result);
        self
    }

    pub fn executor(mut self, executor: SqlExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Opens the handle: freezes the configuration, creates the version
    /// table and, unless disabled, migrates every single-table entity.
    pub fn open(self) -> RowshapeResult<Rowshape> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let executor = match self.executor {
            Some(executor) => executor,
            None => {
                log::error!("No executor is configured");
                return Err(RowshapeError::new(
                    "No executor is configured",
                    ErrorKind::InvalidOperation,
                ));
            }
        };

        let rowshape = Rowshape::new(self.config, executor);
        rowshape.initialize(self.migrate_on_open)?;
        Ok(rowshape)
    }
}

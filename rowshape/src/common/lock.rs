use crate::common::util::task_util::async_task;
use crate::errors::{ErrorKind, RowshapeError, RowshapeResult};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::sync::Arc;

/// The single write-serialization primitive of a database.
///
/// Every access mode acquires the same reentrant mutex and runs the operation
/// as one critical section, so two operations never interleave their effects
/// on the store. The lock is reentrant: an operation may call back into code
/// that locks again on the same thread.
///
/// Three families of access are offered:
/// - blocking: [DbLock::run] propagates the error, [DbLock::get_or] turns it
///   into the default,
/// - fire-and-forget on a detached thread: [DbLock::spawn] and
///   [DbLock::spawn_get], which log failures instead of propagating them,
/// - awaitable via tokio's blocking pool: [DbLock::run_async] and
///   [DbLock::get_or_async].
///
/// # Examples
///
/// ```rust
/// use rowshape::common::DbLock;
/// use rowshape::errors::RowshapeResult;
///
/// let lock = DbLock::new();
/// let value: RowshapeResult<i32> = lock.run(|| Ok(21 * 2));
/// assert_eq!(value.ok(), Some(42));
/// ```
#[derive(Clone, Default)]
pub struct DbLock {
    inner: Arc<ReentrantMutex<()>>,
}

impl DbLock {
    pub fn new() -> Self {
        DbLock {
            inner: Arc::new(ReentrantMutex::new(())),
        }
    }

    /// Acquires the lock. The critical section lasts until the guard drops.
    pub fn acquire(&self) -> ReentrantMutexGuard<'_, ()> {
        self.inner.lock()
    }

    /// Runs `op` inside the critical section and returns its result.
    pub fn run<R, F>(&self, op: F) -> RowshapeResult<R>
    where
        F: FnOnce() -> RowshapeResult<R>,
    {
        let _guard = self.inner.lock();
        op()
    }

    /// Runs `op` inside the critical section; an error yields `default`.
    pub fn get_or<R, F>(&self, default: R, op: F) -> R
    where
        F: FnOnce() -> RowshapeResult<R>,
    {
        let _guard = self.inner.lock();
        match op() {
            Ok(value) => value,
            Err(err) => {
                log::warn!("Locked operation failed, returning default: {}", err);
                default
            }
        }
    }

    /// Runs `op` on a detached thread. Failures are logged and dropped.
    pub fn spawn<F>(&self, op: F)
    where
        F: FnOnce() -> RowshapeResult<()> + Send + 'static,
    {
        let lock = self.clone();
        async_task(move || {
            let _guard = lock.inner.lock();
            if let Err(err) = op() {
                log::error!("Detached locked operation failed: {}", err);
            }
        });
    }

    /// Runs `op` on a detached thread and hands its value, or `default` on
    /// failure, to `callback` once the critical section is over.
    pub fn spawn_get<R, F, C>(&self, default: R, op: F, callback: C)
    where
        R: Send + 'static,
        F: FnOnce() -> RowshapeResult<R> + Send + 'static,
        C: FnOnce(R) + Send + 'static,
    {
        let lock = self.clone();
        async_task(move || {
            let value = lock.get_or(default, op);
            callback(value);
        });
    }

    /// Runs `op` on tokio's blocking pool inside the critical section and
    /// awaits its result. Must be called from within a tokio runtime.
    pub async fn run_async<R, F>(&self, op: F) -> RowshapeResult<R>
    where
        R: Send + 'static,
        F: FnOnce() -> RowshapeResult<R> + Send + 'static,
    {
        let lock = self.clone();
        match tokio::task::spawn_blocking(move || lock.run(op)).await {
            Ok(result) => result,
            Err(join_err) => {
                log::error!("Locked async operation did not complete: {}", join_err);
                Err(RowshapeError::new(
                    &format!("Locked async operation did not complete: {}", join_err),
                    ErrorKind::InternalError,
                ))
            }
        }
    }

    /// Like [DbLock::run_async], but failures and cancellation yield `default`.
    pub async fn get_or_async<R, F>(&self, default: R, op: F) -> R
    where
        R: Send + 'static,
        F: FnOnce() -> RowshapeResult<R> + Send + 'static,
    {
        match self.run_async(op).await {
            Ok(value) => value,
            Err(err) => {
                log::warn!("Locked async operation failed, returning default: {}", err);
                default
            }
        }
    }
}

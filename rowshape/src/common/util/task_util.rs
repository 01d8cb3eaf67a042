/// Spawn a task on a new detached thread.
/// Avoids contention on a shared pool when many detached writes queue on the database lock.
pub fn async_task<OP>(op: OP)
where
    OP: FnOnce() + Send + 'static,
{
    std::thread::spawn(op);
}

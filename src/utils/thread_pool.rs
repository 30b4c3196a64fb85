use once_cell::sync::OnceCell;
use rayon::ThreadPoolBuilder;
use std::sync::Arc;

/// Global rayon pool used for parallel file hashing.
static THREAD_POOL: OnceCell<Arc<rayon::ThreadPool>> = OnceCell::new();

/// Default worker count when no limit is configured.
fn default_threads() -> usize {
    std::thread::available_parallelism().map_or(4, |n| n.get().min(8))
}

/// Initialize the global thread pool with the specified number of threads
///
/// # Errors
///
/// Returns an error if the thread pool cannot be initialized or was already
/// initialized.
pub fn init_thread_pool(num_threads: usize) -> anyhow::Result<()> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("snapguard-worker-{i}"))
        .build()?;

    THREAD_POOL
        .set(Arc::new(pool))
        .map_err(|_| anyhow::anyhow!("Thread pool already initialized"))?;

    Ok(())
}

/// Get the global thread pool, initializing with default settings if needed
///
/// # Panics
///
/// Panics if the thread pool cannot be created
pub fn get_thread_pool() -> Arc<rayon::ThreadPool> {
    THREAD_POOL
        .get_or_init(|| {
            let pool = ThreadPoolBuilder::new()
                .num_threads(default_threads())
                .thread_name(|i| format!("snapguard-worker-{i}"))
                .build()
                .expect("Failed to create thread pool");
            Arc::new(pool)
        })
        .clone()
}

/// Run a function in the configured thread pool
pub fn run_in_pool<F, R>(f: F) -> R
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    let pool = get_thread_pool();
    pool.install(f)
}

/// Configure the pool from the `[scan]` config section. A zero thread count
/// means auto-size; an already-initialized pool is left as is.
pub fn configure_from_config(config: &crate::config::Config) {
    if config.scan.parallel_threads > 0 && THREAD_POOL.get().is_none() {
        // Ignore a lost race with another initializer
        let _ = init_thread_pool(config.scan.parallel_threads);
    }
}

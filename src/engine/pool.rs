// src/engine/pool.rs
//
// Global thread pool for batch processing.
//
// One pool is built lazily on first use and reused by every batch.
// Thread count comes from std::thread::available_parallelism() (cgroup
// aware) unless ENDCRYPT_THREADS overrides it. Changes to the variable after
// initialization have no effect.

use crate::error::{EndcryptError, Result};
use rayon::ThreadPool;
use std::sync::OnceLock;

pub const ENV_THREADS: &str = "ENDCRYPT_THREADS";

/// Upper bound on the configured thread count.
pub const MAX_THREADS: usize = 256;

const MIN_RAYON_THREADS: usize = 1;

static GLOBAL_THREAD_POOL: OnceLock<std::result::Result<ThreadPool, String>> = OnceLock::new();

/// Thread count from an `ENDCRYPT_THREADS` value, falling back to the
/// detected parallelism when absent or unparsable.
pub(crate) fn resolve_thread_count(raw: Option<&str>, detected: usize) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(detected)
        .clamp(MIN_RAYON_THREADS, MAX_THREADS)
}

fn build_pool() -> std::result::Result<ThreadPool, String> {
    let detected = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(MIN_RAYON_THREADS);
    let num_threads = resolve_thread_count(std::env::var(ENV_THREADS).ok().as_deref(), detected);

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("endcrypt-worker-{i}"))
        .build()
        .or_else(|e| {
            tracing::warn!(num_threads, error = %e, "falling back to a single-thread pool");
            rayon::ThreadPoolBuilder::new()
                .num_threads(MIN_RAYON_THREADS)
                .build()
        })
        .map_err(|e| format!("failed to build worker pool: {e}"))
}

pub fn get_pool() -> Result<&'static ThreadPool> {
    GLOBAL_THREAD_POOL
        .get_or_init(build_pool)
        .as_ref()
        .map_err(|e| EndcryptError::internal_panic(e.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_count_override() {
        assert_eq!(resolve_thread_count(Some("3"), 8), 3);
        assert_eq!(resolve_thread_count(Some(" 2 "), 8), 2);
        assert_eq!(resolve_thread_count(None, 8), 8);
        assert_eq!(resolve_thread_count(Some("zero"), 8), 8);
        assert_eq!(resolve_thread_count(Some("0"), 8), 8);
        assert_eq!(resolve_thread_count(Some("100000"), 8), MAX_THREADS);
        assert_eq!(resolve_thread_count(None, 0), 1);
    }

    #[test]
    fn pool_is_shared() {
        let a = get_pool().unwrap() as *const ThreadPool;
        let b = get_pool().unwrap() as *const ThreadPool;
        assert_eq!(a, b);
        assert!(get_pool().unwrap().current_num_threads() >= 1);
    }
}

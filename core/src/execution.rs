//! Parallel-iteration helpers used by the Pipeline Coordinator's per-layer
//! loop (§5). This crate targets native execution only, so unlike the
//! teacher's later single-threaded-WASM-plus-Web-Worker rewrite of this
//! module, these are real `rayon`-backed implementations.

use rayon::prelude::*;

/// Run `func` over every item in `items`, one `rayon` task per item.
pub fn execute_parallel<I, F, R>(items: I, func: F) -> Vec<R>
where
    I: IntoParallelIterator,
    I::Item: Send,
    F: Fn(I::Item) -> R + Send + Sync,
    R: Send,
{
    items.into_par_iter().map(func).collect()
}

/// Like [`execute_parallel`] but drops `None` results.
pub fn execute_parallel_filter_map<I, F, R>(items: I, func: F) -> Vec<R>
where
    I: IntoParallelIterator,
    I::Item: Send,
    F: Fn(I::Item) -> Option<R> + Send + Sync,
    R: Send,
{
    items.into_par_iter().filter_map(func).collect()
}

/// Current size of the global `rayon` thread pool.
pub fn current_num_threads() -> usize {
    rayon::current_num_threads()
}

//! A fixed-size parallel executor (§4.5): evaluates one task per population member, returning
//! results in submission order. Grounded on the teacher crate's `Fitness::call_for_population`
//! (`rayon::prelude::*`, `par_iter_mut().filter(...).for_each(...)`), generalized from an
//! in-process CPU-bound closure to a closure whose body blocks on child-process I/O — still a
//! legitimate `rayon` use because OS threads parked in `wait(2)` don't contend for the CPU.
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

#[derive(Debug)]
pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    /// `jobs` workers; `jobs == 0` defers to rayon's own CPU-count default.
    pub fn new(jobs: usize) -> Self {
        let mut builder = ThreadPoolBuilder::new();
        if jobs > 0 {
            builder = builder.num_threads(jobs);
        }
        let pool = builder
            .build()
            .expect("failed to build worker thread pool");
        Self { pool }
    }

    /// Run `evaluate` once per item, in parallel, returning results in `items`' order.
    pub fn map<T, R, F>(&self, items: &[T], evaluate: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        self.pool
            .install(|| items.par_iter().map(evaluate).collect::<Vec<_>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn preserves_submission_order() {
        let pool = WorkerPool::new(4);
        let items: Vec<i32> = (0..50).collect();
        let results = pool.map(&items, |&i| i * 2);
        let expected: Vec<i32> = items.iter().map(|&i| i * 2).collect();
        assert_eq!(results, expected);
    }

    #[test]
    fn evaluates_every_item_exactly_once() {
        let pool = WorkerPool::new(2);
        let counter = AtomicUsize::new(0);
        let items: Vec<()> = vec![(); 20];
        pool.map(&items, |_| counter.fetch_add(1, Ordering::SeqCst));
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }
}

//! Fixed worker pool for the data-parallel phases.
//!
//! The vehicle slice is cut into `ceil(n / workers)`-sized chunks, one per
//! worker, and every call returns only after all chunks are done, so each
//! phase is separated from the next by a full join.  Results come back in
//! slice order regardless of which worker produced them.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::SimResult;

pub struct WorkerPool {
    /// `None` runs everything on the calling thread.
    pool:    Option<ThreadPool>,
    workers: usize,
}

impl WorkerPool {
    /// Run phases inline on the coordinating thread.
    pub fn sequential() -> Self {
        Self { pool: None, workers: 1 }
    }

    /// Build a pool of `workers` threads, or one per logical core if `None`.
    pub fn new(workers: Option<usize>) -> SimResult<Self> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("ca-worker-{i}"));
        if let Some(n) = workers {
            builder = builder.num_threads(n);
        }
        let pool = builder.build()?;
        let workers = pool.current_num_threads();
        Ok(Self { pool: Some(pool), workers })
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    fn chunk_len(&self, n: usize) -> usize {
        n.div_ceil(self.workers).max(1)
    }

    /// Apply `f` to every item.
    pub fn for_each_mut<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(&mut T) + Sync,
    {
        match &self.pool {
            None => items.iter_mut().for_each(f),
            Some(pool) => {
                let chunk = self.chunk_len(items.len());
                pool.install(|| {
                    items
                        .par_chunks_mut(chunk)
                        .for_each(|part| part.iter_mut().for_each(&f));
                });
            }
        }
    }

    /// Apply `f` to every item and collect the results in slice order.
    pub fn map_mut<T, R, F>(&self, items: &mut [T], f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(&mut T) -> R + Sync,
    {
        match &self.pool {
            None => items.iter_mut().map(f).collect(),
            Some(pool) => {
                let chunk = self.chunk_len(items.len());
                let parts: Vec<Vec<R>> = pool.install(|| {
                    items
                        .par_chunks_mut(chunk)
                        .map(|part| part.iter_mut().map(&f).collect())
                        .collect()
                });
                parts.into_iter().flatten().collect()
            }
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .field("parallel", &self.is_parallel())
            .finish()
    }
}

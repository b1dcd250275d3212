//! Work partitioning and phase synchronization.
//!
//! A [`WorkPartitioner`] splits `total_units` units of work (element positions or
//! token columns) into at most `thread_count` contiguous chunks, one per worker
//! thread, and owns the barrier those workers meet at when a phase ends.
//!
//! ## The barrier contract
//!
//! The barrier is sized `thread_count + 1`: every dispatched worker **and** the
//! dispatching thread must call [`WorkPartitioner::await_all`] (or wait on a clone of
//! [`WorkPartitioner::barrier`]) exactly once per phase. A worker that skips the wait
//! deadlocks the whole phase. This is a documented invariant, not something checked
//! at runtime. [`WorkPartitioner::run_phase`] upholds it for you: a worker whose
//! chunk fails or panics records the failure and still reaches the barrier, and
//! the failure is then reported as a run-level error.
//!
//! ## Sizing
//!
//! ```text
//! thread_count     = min(max_units_per_thread, max_threads, ceil(total / max_units_per_thread))
//! units_per_thread = ceil(total / thread_count)
//! ```
//!
//! Every chunk has `units_per_thread` units except the last, which takes the
//! remainder.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};

/// One contiguous chunk of work handed to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk among the claimed chunks.
    pub index: usize,
    /// First unit in the chunk.
    pub lower_bound: usize,
    /// Number of units in the chunk.
    pub workload: usize,
}

impl Chunk {
    /// The half-open unit range covered by this chunk.
    pub fn range(&self) -> Range<usize> {
        self.lower_bound..self.lower_bound + self.workload
    }
}

/// Cooperative cancellation signal, observed at phase boundaries only.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A fresh, uncancelled flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Running chunks finish; the next phase boundary fails.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Divides a fixed number of work units into chunks and synchronizes their workers.
#[derive(Debug)]
pub struct WorkPartitioner {
    max_threads: usize,
    max_units_per_thread: usize,
    total_units: usize,
    thread_count: usize,
    units_per_thread: usize,
    claimed: usize,
    barrier: Arc<Barrier>,
}

impl WorkPartitioner {
    /// Create a partitioner for `total_units` units.
    ///
    /// Fails when `max_threads` or `max_units_per_thread` is zero.
    pub fn new(max_threads: usize, max_units_per_thread: usize, total_units: usize) -> Result<Self> {
        if max_threads == 0 {
            return Err(Error::invalid("max_threads", "must be at least 1"));
        }
        if max_units_per_thread == 0 {
            return Err(Error::invalid("max_chunk_size", "must be at least 1"));
        }
        let mut partitioner = Self {
            max_threads,
            max_units_per_thread,
            total_units: 0,
            thread_count: 0,
            units_per_thread: 0,
            claimed: 0,
            barrier: Arc::new(Barrier::new(1)),
        };
        partitioner.reset_for(total_units);
        Ok(partitioner)
    }

    /// Like [`WorkPartitioner::new`], additionally capping the thread count at one
    /// less than the available parallelism (never below one).
    pub fn for_available_parallelism(
        max_threads: usize,
        max_units_per_thread: usize,
        total_units: usize,
    ) -> Result<Self> {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let cap = available.saturating_sub(1).max(1);
        Self::new(max_threads.min(cap), max_units_per_thread, total_units)
    }

    /// Reinitialize for a new phase over `total_units` units, with a fresh barrier.
    pub fn reset_for(&mut self, total_units: usize) {
        self.total_units = total_units;
        self.thread_count = self
            .max_units_per_thread
            .min(self.max_threads)
            .min(total_units.div_ceil(self.max_units_per_thread));
        self.units_per_thread = if self.thread_count == 0 {
            0
        } else {
            total_units.div_ceil(self.thread_count)
        };
        self.claimed = 0;
        self.barrier = Arc::new(Barrier::new(self.thread_count + 1));
    }

    /// Number of chunks (and worker threads) for the current phase.
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Units in every chunk but the last.
    pub fn units_per_thread(&self) -> usize {
        self.units_per_thread
    }

    /// Total units in the current phase.
    pub fn total_units(&self) -> usize {
        self.total_units
    }

    /// Chunks claimed so far in the current phase.
    pub fn num_claimed(&self) -> usize {
        self.claimed
    }

    /// Whether there are unclaimed chunks left.
    pub fn has_more(&self) -> bool {
        self.claimed < self.thread_count
    }

    /// First unit of the next chunk.
    pub fn lower_bound(&self) -> usize {
        (self.claimed * self.units_per_thread).min(self.total_units)
    }

    /// Units in the next chunk; the last chunk takes the remainder.
    pub fn workload(&self) -> usize {
        if self.claimed + 1 == self.thread_count {
            self.total_units - self.lower_bound()
        } else {
            self.units_per_thread
                .min(self.total_units - self.lower_bound())
        }
    }

    /// Claim the next chunk.
    ///
    /// Takes `&mut self`: claims are serialized by the dispatching thread, which then
    /// hands each chunk to a worker.
    pub fn claim_next(&mut self) -> Option<Chunk> {
        if !self.has_more() {
            return None;
        }
        let chunk = Chunk {
            index: self.claimed,
            lower_bound: self.lower_bound(),
            workload: self.workload(),
        };
        self.claimed += 1;
        Some(chunk)
    }

    /// A handle on the current phase's barrier, for workers.
    pub fn barrier(&self) -> Arc<Barrier> {
        Arc::clone(&self.barrier)
    }

    /// Block until every dispatched worker and the dispatcher have arrived.
    pub fn await_all(&self) {
        self.barrier.wait();
    }

    /// Run one barrier-synchronized phase.
    ///
    /// Every remaining chunk is claimed and run on its own scoped OS thread; the
    /// dispatcher then waits at the barrier. Failures and panics inside `work` are
    /// collected and surface as [`Error::WorkerFailed`] once every worker has
    /// arrived. A cancellation requested on `cancel` is reported as
    /// [`Error::Cancelled`] at the same boundary.
    pub fn run_phase<F>(&mut self, phase: &'static str, cancel: Option<&CancelFlag>, work: F) -> Result<()>
    where
        F: Fn(Chunk) -> Result<()> + Sync,
    {
        let failures: Mutex<Vec<String>> = Mutex::new(Vec::new());

        std::thread::scope(|scope| {
            while let Some(chunk) = self.claim_next() {
                let barrier = self.barrier();
                let work = &work;
                let failures = &failures;
                scope.spawn(move || {
                    match panic::catch_unwind(AssertUnwindSafe(|| work(chunk))) {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => failures.lock().push(err.to_string()),
                        Err(payload) => failures.lock().push(panic_message(payload.as_ref())),
                    }
                    barrier.wait();
                });
            }
            self.await_all();
        });

        let failures = failures.into_inner();
        if !failures.is_empty() {
            return Err(Error::WorkerFailed {
                phase,
                message: failures.join("; "),
            });
        }
        if cancel.is_some_and(CancelFlag::is_cancelled) {
            return Err(Error::Cancelled { phase });
        }
        tracing::debug!(phase, threads = self.thread_count, units = self.total_units, "phase complete");
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "worker panicked".to_string()
    }
}

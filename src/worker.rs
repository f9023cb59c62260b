use std::{
    cmp,
    panic::{self, AssertUnwindSafe},
    thread,
};

extern crate crossbeam_deque;
extern crate crossbeam_utils;

use crossbeam_deque::{Injector, Steal};

use super::{
    callable::BoundCall,
    error::{Fault, InvokeError},
};

/// Outcome of one callable, `None` until a worker has run it.
type ResultSlot<R> = Option<Result<R, Fault>>;

/// Job item which is pushed into the global fifo.
///
/// Each job exclusively owns the result slot of its input index,
/// so no two workers can write the same slot.
struct SlotJob<'s, 'a, R> {
    index: usize,
    call: BoundCall<'a, R>,
    slot: &'s mut ResultSlot<R>,
}

impl<'s, 'a, R> SlotJob<'s, 'a, R> {
    /// Call bound callable and store its outcome. Panic is caught and stored as `Fault`.
    fn run(self) {
        let index = self.index;
        let outcome = panic::catch_unwind(AssertUnwindSafe(self.call))
            .map_err(|payload| Fault::panicked(index, payload));
        *self.slot = Some(outcome);
    }
}

/// Bounded pool of worker threads which processes one batch at a time.
///
/// Threads are scoped to a batch, so callables may borrow from the caller's stack.
#[derive(Clone, Copy, Debug)]
pub(crate) struct WorkerPool {
    worker_count: usize,
}

impl WorkerPool {
    /// Create new pool with `available_parallelism - 1` workers, at least 1.
    ///
    /// One execution unit is left for the calling thread.
    pub fn new_automatic() -> Self {
        let available_parallelism = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            worker_count: cmp::max(1, available_parallelism.saturating_sub(1)),
        }
    }

    /// Create new pool with given worker count. Return `None` when `worker_count` is 0.
    pub fn try_new(worker_count: usize) -> Option<Self> {
        if worker_count == 0 {
            return None;
        }

        Some(Self { worker_count })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Run every call concurrently and block until all of them are finished.
    ///
    /// Returned list is ordered by the input index of calls, not completion order.
    pub fn run<'a, R>(&self, calls: Vec<BoundCall<'a, R>>) -> Result<Vec<Result<R, Fault>>, InvokeError>
    where
        R: Send + 'a,
    {
        let call_count = calls.len();
        let mut slots: Vec<ResultSlot<R>> = Vec::with_capacity(call_count);
        slots.resize_with(call_count, || None);

        // Every job must be inserted before any worker starts, so an empty fifo means done.
        let global_fifo = Injector::new();
        for (index, (call, slot)) in calls.into_iter().zip(slots.iter_mut()).enumerate() {
            global_fifo.push(SlotJob { index, call, slot });
        }

        let thread_count = cmp::min(self.worker_count, call_count);
        crossbeam_utils::thread::scope(|scope| {
            let mut spawned_count = 0usize;
            for id in 0..thread_count {
                let global_fifo = &global_fifo;
                let spawned = scope
                    .builder()
                    .name(format!("WorkerPool thread_index:{}", id))
                    .spawn(move |_| {
                        log::trace!("worker {} started", id);
                        let processed = drain(global_fifo);
                        log::trace!("worker {} exited after {} job(s)", id, processed);
                    });

                match spawned {
                    Ok(_) => spawned_count += 1,
                    Err(e) => log::warn!("failed to spawn worker {}: {}", id, e),
                }
            }

            // Nobody else can process jobs.
            if spawned_count == 0 {
                drain(&global_fifo);
            }
        })
        .map_err(|_| InvokeError::WorkerLost)?;

        // Release borrowed slots.
        drop(global_fifo);

        slots
            .into_iter()
            .map(|slot| slot.ok_or(InvokeError::WorkerLost))
            .collect()
    }
}

/// Steal and run jobs until the global fifo is empty. Return processed job count.
fn drain<R>(global_fifo: &Injector<SlotJob<'_, '_, R>>) -> usize {
    let backoff = crossbeam_utils::Backoff::new();
    let mut processed = 0usize;
    loop {
        match global_fifo.steal() {
            Steal::Success(job) => {
                backoff.reset();
                job.run();
                processed += 1;
            }
            Steal::Empty => return processed,
            // We have to wait thread for a while for retrying stealing.
            Steal::Retry => backoff.spin(),
        }
    }
}

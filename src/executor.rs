use std::{cmp, fmt::Display, thread};

use futures::channel::oneshot;

use super::callable::{Callable, Inputs};
use super::error::{Fault, Faults, InvokeError, EMPTY_BATCH};
use super::worker::WorkerPool;

/// The type which executes a batch of callables using its worker pool.
///
/// Every entry point of the crate ends up in `Executor::settle`, whether it returns values or not.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Executor {
    worker: WorkerPool,
}

impl Executor {
    pub fn new(worker: WorkerPool) -> Self {
        Self { worker }
    }

    pub fn worker_count(&self) -> usize {
        self.worker.worker_count()
    }

    /// Run batch with procedures. Faults are reported after every procedure is finished.
    pub fn invoke<'a, A, B>(
        &self,
        inputs: Inputs<'a, A, B>,
        batch: Vec<Callable<'a, A, B, ()>>,
    ) -> Result<(), InvokeError>
    where
        A: Sync,
        B: Sync,
    {
        gather(self.settle(inputs, batch)?).map(|_| ())
    }

    /// Run batch with functions and return values ordered by input index.
    pub fn collect<'a, A, B, R>(
        &self,
        inputs: Inputs<'a, A, B>,
        batch: Vec<Callable<'a, A, B, R>>,
    ) -> Result<Vec<R>, InvokeError>
    where
        A: Sync,
        B: Sync,
        R: Send + 'a,
    {
        gather(self.settle(inputs, batch)?)
    }

    /// Run batch with fallible functions. `Err` values are reported as faults as panics are.
    pub fn try_collect<'a, A, B, T, E>(
        &self,
        inputs: Inputs<'a, A, B>,
        batch: Vec<Callable<'a, A, B, Result<T, E>>>,
    ) -> Result<Vec<T>, InvokeError>
    where
        A: Sync,
        B: Sync,
        T: Send + 'a,
        E: Display + Send + 'a,
    {
        let settled = self
            .settle(inputs, batch)?
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| outcome.and_then(|r| r.map_err(|e| Fault::failed(index, &e))))
            .collect();
        gather(settled)
    }

    /// Run `job` on a dedicated coordinator thread and suspend until it sends its result back.
    ///
    /// The thread awaiting the returned future is never blocked by the batch.
    pub async fn suspend<T, J>(self, job: J) -> Result<T, InvokeError>
    where
        T: Send + 'static,
        J: FnOnce(Executor) -> Result<T, InvokeError> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        thread::Builder::new()
            .name("Executor coordinator".into())
            .spawn(move || {
                // Receiver can be dropped when awaiting future was dropped.
                let _ = tx.send(job(self));
            })?;

        rx.await.map_err(|_| InvokeError::WorkerLost)?
    }

    /// Validate and bind every callable, then run them and wait for all outcomes.
    ///
    /// Nothing is launched when validation fails.
    fn settle<'a, A, B, R>(
        &self,
        inputs: Inputs<'a, A, B>,
        batch: Vec<Callable<'a, A, B, R>>,
    ) -> Result<Vec<Result<R, Fault>>, InvokeError>
    where
        A: Sync,
        B: Sync,
        R: Send + 'a,
    {
        ensure_batch(batch.len())?;
        let calls = batch
            .into_iter()
            .map(|callable| callable.bind(inputs))
            .collect::<Result<Vec<_>, _>>()?;

        let call_count = calls.len();
        log::debug!(
            "dispatching batch of {} callable(s) over {} worker(s)",
            call_count,
            cmp::min(call_count, self.worker_count())
        );
        let settled = self.worker.run(calls)?;
        log::debug!("batch of {} callable(s) finished", call_count);

        Ok(settled)
    }
}

/// Check batch has any callable.
pub(crate) fn ensure_batch(len: usize) -> Result<(), InvokeError> {
    if len == 0 {
        Err(InvokeError::InvalidArgument(EMPTY_BATCH))
    } else {
        Ok(())
    }
}

/// Unwrap outcomes in order, or aggregate every fault when any callable faulted.
fn gather<R>(settled: Vec<Result<R, Fault>>) -> Result<Vec<R>, InvokeError> {
    let mut values = Vec::with_capacity(settled.len());
    let mut faults = vec![];
    for outcome in settled {
        match outcome {
            Ok(value) => values.push(value),
            Err(fault) => faults.push(fault),
        }
    }

    if faults.is_empty() {
        Ok(values)
    } else {
        Err(InvokeError::ExecutionFault(Faults::new(faults)))
    }
}

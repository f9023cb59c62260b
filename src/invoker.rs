use std::{fmt::Display, future::Future};

use paste::paste;

use super::callable::{Callable, Inputs};
use super::error::{InvokeError, MISSING_INPUT, ZERO_WORKERS};
use super::executor::{ensure_batch, Executor};
use super::worker::WorkerPool;

/// Runs batches of callables concurrently on a bounded worker pool.
///
/// Every operation is provided for callables which take 0, 1 or 2 shared inputs
/// (`invoke`, `invoke1`, `invoke2`, ...) and in a blocking and a suspending (`_async`) form.
/// Blocking forms lend shared inputs by reference, so callables may borrow from the caller.
/// Suspending forms take shared inputs by value because the batch outlives the calling frame.
///
/// Shared inputs are given as `&value` (or `value` for suspending forms), or `None`
/// which is rejected as a missing input before anything runs.
///
/// Faults are captured with `std::panic::catch_unwind`. The final binary must be built with
/// `panic = "unwind"` (the default), otherwise a panicking callable aborts the process.
#[derive(Clone, Copy, Debug)]
pub struct Invoker {
    executor: Executor,
}

impl Invoker {
    /// Create new invoker with `available_parallelism - 1` workers, at least 1.
    pub fn new() -> Self {
        Self {
            executor: Executor::new(WorkerPool::new_automatic()),
        }
    }

    /// Create new invoker which runs at most `worker_count` callables at the same time.
    ///
    /// `worker_count` must not be 0.
    pub fn with_workers(worker_count: usize) -> Result<Self, InvokeError> {
        let worker = WorkerPool::try_new(worker_count)
            .ok_or(InvokeError::InvalidArgument(ZERO_WORKERS))?;
        Ok(Self {
            executor: Executor::new(worker),
        })
    }

    /// Get the maximum count of callables which run at the same time.
    pub fn worker_count(&self) -> usize {
        self.executor.worker_count()
    }

    /// Run already tagged callables with given `inputs`, and return values ordered by input index.
    ///
    /// Every callable must take as many shared inputs as `inputs` holds.
    /// Otherwise nothing runs and `InvalidArgument` is returned.
    pub fn dispatch<'a, A, B, R>(
        &self,
        inputs: Inputs<'a, A, B>,
        batch: Vec<Callable<'a, A, B, R>>,
    ) -> Result<Vec<R>, InvokeError>
    where
        A: Sync,
        B: Sync,
        R: Send + 'a,
    {
        self.executor.collect(inputs, batch)
    }
}

impl Default for Invoker {
    fn default() -> Self {
        Self::new()
    }
}

fn require<T>(input: Option<T>) -> Result<T, InvokeError> {
    input.ok_or(InvokeError::InvalidArgument(MISSING_INPUT))
}

/// Macro for helping implementing entry points of `Invoker` for callables of each arity.
///
/// `$ctor` is the `Callable` constructor of the arity, `($ta, $tb)` are the `Inputs` types
/// and `$inputs` builds `Inputs` from the shared input references `$i`.
macro_rules! invoker_impl_arity {
    {$($cnt:literal)?, $ctor:ident, ($($t:ident),*), ($($i:ident),*), ($ta:ty, $tb:ty), $inputs:expr} => {
        paste! {
            impl Invoker {
                /// Run procedures concurrently and block until every procedure is finished.
                ///
                /// Panicked procedures do not stop others and are reported as `ExecutionFault`.
                pub fn [<invoke $($cnt)?>]<'a, $($t,)* F>(
                    &self,
                    $($i: impl Into<Option<&'a $t>>,)*
                    procs: Vec<F>,
                ) -> Result<(), InvokeError>
                where
                    $($t: Sync + 'a,)*
                    F: FnOnce($(&$t),*) + Send + 'a,
                {
                    $(let $i = require($i.into())?;)*
                    let inputs: Inputs<'a, $ta, $tb> = $inputs;
                    let batch = procs
                        .into_iter()
                        .map(|f| Callable::<$ta, $tb, ()>::$ctor(f))
                        .collect();
                    self.executor.invoke(inputs, batch)
                }

                /// Run functions concurrently, block until all are finished and
                /// return their values ordered by input index.
                ///
                /// If any function panicked, no value is returned but `ExecutionFault`.
                pub fn [<collect $($cnt)?>]<'a, $($t,)* R, F>(
                    &self,
                    $($i: impl Into<Option<&'a $t>>,)*
                    funcs: Vec<F>,
                ) -> Result<Vec<R>, InvokeError>
                where
                    $($t: Sync + 'a,)*
                    R: Send + 'a,
                    F: FnOnce($(&$t),*) -> R + Send + 'a,
                {
                    $(let $i = require($i.into())?;)*
                    let inputs: Inputs<'a, $ta, $tb> = $inputs;
                    let batch = funcs
                        .into_iter()
                        .map(|f| Callable::<$ta, $tb, R>::$ctor(f))
                        .collect();
                    self.executor.collect(inputs, batch)
                }

                /// Same as `collect` but functions return `Result`.
                /// Each `Err` is reported as a fault, together with panics.
                pub fn [<try_collect $($cnt)?>]<'a, $($t,)* R, E, F>(
                    &self,
                    $($i: impl Into<Option<&'a $t>>,)*
                    funcs: Vec<F>,
                ) -> Result<Vec<R>, InvokeError>
                where
                    $($t: Sync + 'a,)*
                    R: Send + 'a,
                    E: Display + Send + 'a,
                    F: FnOnce($(&$t),*) -> Result<R, E> + Send + 'a,
                {
                    $(let $i = require($i.into())?;)*
                    let inputs: Inputs<'a, $ta, $tb> = $inputs;
                    let batch = funcs
                        .into_iter()
                        .map(|f| Callable::<$ta, $tb, Result<R, E>>::$ctor(f))
                        .collect();
                    self.executor.try_collect(inputs, batch)
                }

                /// Suspending form of `invoke`. Arguments are validated before returning the future.
                pub fn [<invoke $($cnt)? _async>]<$($t,)* F>(
                    &self,
                    $($i: impl Into<Option<$t>>,)*
                    procs: Vec<F>,
                ) -> impl Future<Output = Result<(), InvokeError>> + Send
                where
                    $($t: Send + Sync + 'static,)*
                    F: FnOnce($(&$t),*) + Send + 'static,
                {
                    let executor = self.executor;
                    $(let $i = require($i.into());)*
                    let checked = ensure_batch(procs.len());

                    async move {
                        $(let $i = $i?;)*
                        checked?;
                        executor
                            .suspend(move |executor| {
                                $(let $i = &$i;)*
                                let inputs: Inputs<'_, $ta, $tb> = $inputs;
                                let batch = procs
                                    .into_iter()
                                    .map(|f| Callable::<$ta, $tb, ()>::$ctor(f))
                                    .collect();
                                executor.invoke(inputs, batch)
                            })
                            .await
                    }
                }

                /// Suspending form of `collect`. Arguments are validated before returning the future.
                pub fn [<collect $($cnt)? _async>]<$($t,)* R, F>(
                    &self,
                    $($i: impl Into<Option<$t>>,)*
                    funcs: Vec<F>,
                ) -> impl Future<Output = Result<Vec<R>, InvokeError>> + Send
                where
                    $($t: Send + Sync + 'static,)*
                    R: Send + 'static,
                    F: FnOnce($(&$t),*) -> R + Send + 'static,
                {
                    let executor = self.executor;
                    $(let $i = require($i.into());)*
                    let checked = ensure_batch(funcs.len());

                    async move {
                        $(let $i = $i?;)*
                        checked?;
                        executor
                            .suspend(move |executor| {
                                $(let $i = &$i;)*
                                let inputs: Inputs<'_, $ta, $tb> = $inputs;
                                let batch = funcs
                                    .into_iter()
                                    .map(|f| Callable::<$ta, $tb, R>::$ctor(f))
                                    .collect();
                                executor.collect(inputs, batch)
                            })
                            .await
                    }
                }

                /// Suspending form of `try_collect`. Arguments are validated before returning the future.
                pub fn [<try_collect $($cnt)? _async>]<$($t,)* R, E, F>(
                    &self,
                    $($i: impl Into<Option<$t>>,)*
                    funcs: Vec<F>,
                ) -> impl Future<Output = Result<Vec<R>, InvokeError>> + Send
                where
                    $($t: Send + Sync + 'static,)*
                    R: Send + 'static,
                    E: Display + Send + 'static,
                    F: FnOnce($(&$t),*) -> Result<R, E> + Send + 'static,
                {
                    let executor = self.executor;
                    $(let $i = require($i.into());)*
                    let checked = ensure_batch(funcs.len());

                    async move {
                        $(let $i = $i?;)*
                        checked?;
                        executor
                            .suspend(move |executor| {
                                $(let $i = &$i;)*
                                let inputs: Inputs<'_, $ta, $tb> = $inputs;
                                let batch = funcs
                                    .into_iter()
                                    .map(|f| Callable::<$ta, $tb, Result<R, E>>::$ctor(f))
                                    .collect();
                                executor.try_collect(inputs, batch)
                            })
                            .await
                    }
                }
            }
        }
    };
}

invoker_impl_arity! {, nullary, (), (), ((), ()), Inputs::Zero}
invoker_impl_arity! {1, unary, (A), (a), (A, ()), Inputs::One(a)}
invoker_impl_arity! {2, binary, (A, B), (a, b), (A, B), Inputs::Two(a, b)}

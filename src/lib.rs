//! Runs batches of callables concurrently and collects their results in input order.
//!
//! ```
//! use fanout::Invoker;
//!
//! let invoker = Invoker::new();
//! let base = 10;
//! let funcs: Vec<fn(&i32) -> i32> = vec![|b| b + 1, |b| b * 2, |b| b - 3];
//! let values = invoker.collect1(&base, funcs).unwrap();
//! assert_eq!(values, vec![11, 20, 7]);
//! ```
mod callable;
mod error;
mod executor;
mod invoker;
mod worker;

pub use callable::{Callable, Inputs};
pub use error::{Fault, FaultKind, Faults, InvokeError};
pub use invoker::Invoker;

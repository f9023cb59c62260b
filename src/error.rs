extern crate thiserror;

use std::{any::Any, fmt, ops::Deref};
use thiserror::Error;

pub(crate) const EMPTY_BATCH: &str = "Callable batch cannot be empty.";
pub(crate) const MISSING_INPUT: &str = "Shared input cannot be missing.";
pub(crate) const UNKNOWN_SHAPE: &str = "Cannot determine callable shape.";
pub(crate) const ZERO_WORKERS: &str = "Worker count must be at least 1.";

/// Specifies library's error codes.
#[derive(Error, Debug)]
pub enum InvokeError {
    /// Rejected before any callable was launched.
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// One or more callables of the batch faulted. Siblings still ran to completion.
    #[error("Execution fault: {0}")]
    ExecutionFault(Faults),
    #[error("Failed to spawn coordinator thread.")]
    ThreadSpawn(#[from] std::io::Error),
    #[error("Worker finished without reporting every result.")]
    WorkerLost,
}

impl InvokeError {
    /// Get faults when this error is `InvokeError::ExecutionFault`.
    pub fn faults(&self) -> Option<&Faults> {
        match self {
            InvokeError::ExecutionFault(faults) => Some(faults),
            _ => None,
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, InvokeError::InvalidArgument(_))
    }
}

/// How a callable failed to produce its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultKind {
    /// Callable panicked.
    Panicked,
    /// Callable returned `Err`.
    Failed,
}

/// Fault raised by the callable at `index` of a batch.
#[derive(Clone, Debug)]
pub struct Fault {
    index: usize,
    kind: FaultKind,
    message: String,
}

impl Fault {
    /// Build fault from panic payload caught by `std::panic::catch_unwind`.
    ///
    /// Payload of `panic!` is either `&'static str` or `String`, other payloads are not readable.
    pub(crate) fn panicked(index: usize, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };

        Self {
            index,
            kind: FaultKind::Panicked,
            message,
        }
    }

    pub(crate) fn failed(index: usize, error: &dyn fmt::Display) -> Self {
        Self {
            index,
            kind: FaultKind::Failed,
            message: error.to_string(),
        }
    }

    /// Input position of the faulted callable.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            FaultKind::Panicked => "panicked",
            FaultKind::Failed => "failed",
        };
        write!(f, "callable {} {}: {}", self.index, verb, self.message)
    }
}

/// Non-empty fault list of one batch, sorted by input index.
#[derive(Clone, Debug)]
pub struct Faults(Vec<Fault>);

impl Faults {
    pub(crate) fn new(mut faults: Vec<Fault>) -> Self {
        faults.sort_by_key(|f| f.index);
        Self(faults)
    }

    /// Take the faults out, still sorted by input index.
    pub fn into_vec(self) -> Vec<Fault> {
        self.0
    }
}

impl Deref for Faults {
    type Target = [Fault];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Faults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} callable(s) faulted", self.0.len())?;
        for fault in &self.0 {
            write!(f, "; {}", fault)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_readable() {
        let fault = Fault::panicked(2, Box::new("static message"));
        assert_eq!(fault.message(), "static message");
        assert_eq!(fault.kind(), FaultKind::Panicked);

        let fault = Fault::panicked(0, Box::new(format!("owned {}", 7)));
        assert_eq!(fault.message(), "owned 7");

        let fault = Fault::panicked(1, Box::new(42u32));
        assert_eq!(fault.message(), "non-string panic payload");
    }

    #[test]
    fn faults_are_sorted_and_listed() {
        let faults = Faults::new(vec![
            Fault::failed(3, &"late"),
            Fault::panicked(1, Box::new("early")),
        ]);
        assert_eq!(faults.len(), 2);
        assert_eq!(faults[0].index(), 1);
        assert_eq!(faults[1].index(), 3);

        let error = InvokeError::ExecutionFault(faults.clone());
        let indices: Vec<_> = faults.into_vec().iter().map(Fault::index).collect();
        assert_eq!(indices, vec![1, 3]);
        assert_eq!(
            error.to_string(),
            "Execution fault: 2 callable(s) faulted; callable 1 panicked: early; callable 3 failed: late"
        );
        assert!(error.faults().is_some());
        assert!(!error.is_invalid_argument());
    }
}

use super::error::{InvokeError, UNKNOWN_SHAPE};

/// Callable which is bound to its shared inputs and can be called on any worker thread.
pub(crate) type BoundCall<'a, R> = Box<dyn FnOnce() -> R + Send + 'a>;

/// Unit of work of a batch, tagged by how many shared inputs it takes.
///
/// Procedures are callables whose return type `R` is `()`.
pub enum Callable<'a, A, B, R> {
    /// Callable without inputs.
    Nullary(Box<dyn FnOnce() -> R + Send + 'a>),
    /// Callable which borrows the first shared input.
    Unary(Box<dyn FnOnce(&A) -> R + Send + 'a>),
    /// Callable which borrows both shared inputs.
    Binary(Box<dyn FnOnce(&A, &B) -> R + Send + 'a>),
}

impl<'a, A, B, R> Callable<'a, A, B, R> {
    pub fn nullary(f: impl FnOnce() -> R + Send + 'a) -> Self {
        Callable::Nullary(Box::new(f))
    }

    pub fn unary(f: impl FnOnce(&A) -> R + Send + 'a) -> Self {
        Callable::Unary(Box::new(f))
    }

    pub fn binary(f: impl FnOnce(&A, &B) -> R + Send + 'a) -> Self {
        Callable::Binary(Box::new(f))
    }

    /// Get the count of shared inputs this callable takes.
    pub fn arity(&self) -> usize {
        match self {
            Callable::Nullary(_) => 0,
            Callable::Unary(_) => 1,
            Callable::Binary(_) => 2,
        }
    }

    /// Bind callable to given `inputs`.
    ///
    /// Shape of callable and inputs must be matched, otherwise return `InvalidArgument` error.
    pub(crate) fn bind(self, inputs: Inputs<'a, A, B>) -> Result<BoundCall<'a, R>, InvokeError>
    where
        A: Sync,
        B: Sync,
        R: 'a,
    {
        match (self, inputs) {
            (Callable::Nullary(f), Inputs::Zero) => Ok(f),
            (Callable::Unary(f), Inputs::One(a)) => Ok(Box::new(move || f(a))),
            (Callable::Binary(f), Inputs::Two(a, b)) => Ok(Box::new(move || f(a, b))),
            _ => Err(InvokeError::InvalidArgument(UNKNOWN_SHAPE)),
        }
    }
}

/// Shared inputs which are lent to every callable of a batch.
pub enum Inputs<'a, A, B> {
    Zero,
    One(&'a A),
    Two(&'a A, &'a B),
}

impl<'a, A, B> Inputs<'a, A, B> {
    pub fn arity(&self) -> usize {
        match self {
            Inputs::Zero => 0,
            Inputs::One(_) => 1,
            Inputs::Two(_, _) => 2,
        }
    }
}

// Derived impls would require `A: Copy` and `B: Copy`.
impl<'a, A, B> Clone for Inputs<'a, A, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, A, B> Copy for Inputs<'a, A, B> {}

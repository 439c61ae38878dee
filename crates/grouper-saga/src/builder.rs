use std::collections::HashSet;
use std::fmt;

use crate::error::ConstructionError;
use crate::step::Step;

/// An ordered collection of steps, validated and ready for execution.
///
/// Declaration order is the execution order, and its reverse is the
/// compensation order. The step list cannot be changed once built.
pub struct Transaction<R, E> {
    steps: Vec<Step<R, E>>,
}

impl<R, E> Transaction<R, E> {
    /// Build a transaction from an ordered list of steps.
    ///
    /// # Errors
    ///
    /// Returns a [`ConstructionError`] if the list is empty, or if any step id
    /// is blank or appears more than once.
    pub fn new(steps: Vec<Step<R, E>>) -> Result<Self, ConstructionError> {
        if steps.is_empty() {
            return Err(ConstructionError::Empty);
        }

        let mut seen = HashSet::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            if step.id().trim().is_empty() {
                return Err(ConstructionError::EmptyStepId { index });
            }
            if !seen.insert(step.id()) {
                return Err(ConstructionError::DuplicateStepId {
                    id: step.id().to_string(),
                });
            }
        }

        Ok(Self { steps })
    }

    /// Start collecting steps fluently.
    #[must_use]
    pub fn builder() -> TransactionBuilder<R, E> {
        TransactionBuilder::new()
    }

    /// Step ids in execution order.
    #[must_use]
    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(Step::id).collect()
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for a built transaction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub(crate) fn steps(&self) -> &[Step<R, E>] {
        &self.steps
    }
}

impl<R, E> fmt::Debug for Transaction<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("steps", &self.steps)
            .finish()
    }
}

/// Collects steps in order and validates them into a [`Transaction`].
///
/// ```
/// use grouper_saga::{ConstructionError, ExecutionContext, Step, StepFuture, Transaction};
///
/// fn noop(_ctx: &ExecutionContext<()>) -> StepFuture<'_, Result<(), String>> {
///     Box::pin(async { Ok(()) })
/// }
///
/// let err = Transaction::builder()
///     .step(Step::from_fn("insert", noop))
///     .step(Step::from_fn("insert", noop))
///     .build()
///     .expect_err("duplicate ids are rejected");
///
/// assert_eq!(err, ConstructionError::DuplicateStepId { id: "insert".to_string() });
/// ```
pub struct TransactionBuilder<R, E> {
    steps: Vec<Step<R, E>>,
}

impl<R, E> TransactionBuilder<R, E> {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a step after the ones already added.
    #[must_use]
    pub fn step(mut self, step: Step<R, E>) -> Self {
        self.steps.push(step);
        self
    }

    /// Append several steps, keeping their order.
    #[must_use]
    pub fn steps(mut self, steps: impl IntoIterator<Item = Step<R, E>>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Validate the collected steps.
    ///
    /// # Errors
    ///
    /// See [`Transaction::new`].
    pub fn build(self) -> Result<Transaction<R, E>, ConstructionError> {
        Transaction::new(self.steps)
    }
}

impl<R, E> Default for TransactionBuilder<R, E> {
    fn default() -> Self {
        Self::new()
    }
}

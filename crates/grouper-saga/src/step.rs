use std::fmt;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::fn_step::{FnAction, FnUndo};

/// Boxed future returned by closure-based step actions and undos.
pub type StepFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The forward action of a step.
///
/// # Type Parameters
///
/// - `R`: Result value recorded under the step's id
/// - `E`: The error type for step failures
#[async_trait]
pub trait StepAction<R, E>: Send + Sync {
    /// Execute the action against the results of the steps that already ran.
    ///
    /// # Errors
    ///
    /// Returns an error if the action fails. The executor then compensates
    /// every previously completed step.
    async fn execute(&self, ctx: &ExecutionContext<R>) -> Result<R, E>;
}

/// The compensating action of a step.
#[async_trait]
pub trait StepUndo<R, E>: Send + Sync {
    /// Reverse the effect of a successfully completed action.
    ///
    /// Receives the value the action produced.
    ///
    /// # Errors
    ///
    /// Returns an error if the effect could not be reversed.
    async fn compensate(&self, ctx: &ExecutionContext<R>, output: &R) -> Result<(), E>;

    /// Human-readable description of what compensation will do.
    fn description(&self) -> Option<String> {
        None
    }
}

/// A named unit of work with an optional compensating action.
///
/// A step without an undo is irreversible: once its action succeeds, its
/// effect stays in place even if a later step fails.
pub struct Step<R, E> {
    id: String,
    action: Box<dyn StepAction<R, E>>,
    undo: Option<Box<dyn StepUndo<R, E>>>,
    compensation_description: Option<String>,
}

impl<R, E> Step<R, E> {
    /// The id the step's result is recorded under.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the step has a compensating action.
    #[must_use]
    pub fn is_reversible(&self) -> bool {
        self.undo.is_some()
    }

    /// Override the description reported when this step is compensated.
    #[must_use]
    pub fn with_compensation_description(mut self, description: impl Into<String>) -> Self {
        self.compensation_description = Some(description.into());
        self
    }

    /// The explicit description, else the undo's own, else `undo <id>`.
    #[must_use]
    pub fn compensation_description(&self) -> String {
        self.compensation_description
            .clone()
            .or_else(|| self.undo.as_ref().and_then(|undo| undo.description()))
            .unwrap_or_else(|| format!("undo {}", self.id))
    }
}

impl<R, E> Step<R, E>
where
    R: Send + Sync + 'static,
    E: Send + 'static,
{
    /// Create an irreversible step around `action`.
    #[must_use]
    pub fn new<A>(id: impl Into<String>, action: A) -> Self
    where
        A: StepAction<R, E> + 'static,
    {
        Self {
            id: id.into(),
            action: Box::new(action),
            undo: None,
            compensation_description: None,
        }
    }

    /// Create a step from an async closure.
    ///
    /// ```
    /// use grouper_saga::{ExecutionContext, Step};
    ///
    /// let step: Step<u32, String> =
    ///     Step::from_fn("count", |ctx: &ExecutionContext<u32>| {
    ///         let seen = ctx.len();
    ///         Box::pin(async move { Ok(u32::try_from(seen).unwrap_or(u32::MAX)) })
    ///     });
    /// assert_eq!(step.id(), "count");
    /// assert!(!step.is_reversible());
    /// ```
    #[must_use]
    pub fn from_fn<F>(id: impl Into<String>, action: F) -> Self
    where
        F: for<'a> Fn(&'a ExecutionContext<R>) -> StepFuture<'a, Result<R, E>>
            + Send
            + Sync
            + 'static,
    {
        Self::new(id, FnAction::new(action))
    }

    /// Make the step reversible with `undo`.
    #[must_use]
    pub fn with_undo<U>(mut self, undo: U) -> Self
    where
        U: StepUndo<R, E> + 'static,
    {
        self.undo = Some(Box::new(undo));
        self
    }

    /// Attach an async closure as the compensating action.
    #[must_use]
    pub fn with_undo_fn<F>(self, undo: F) -> Self
    where
        F: for<'a> Fn(&'a ExecutionContext<R>, &'a R) -> StepFuture<'a, Result<(), E>>
            + Send
            + Sync
            + 'static,
    {
        self.with_undo(FnUndo::new(undo))
    }

    pub(crate) async fn execute(&self, ctx: &ExecutionContext<R>) -> Result<R, E> {
        self.action.execute(ctx).await
    }

    /// Returns `None` when the step has no undo.
    pub(crate) async fn compensate(
        &self,
        ctx: &ExecutionContext<R>,
        output: &R,
    ) -> Option<Result<(), E>> {
        match &self.undo {
            Some(undo) => Some(undo.compensate(ctx, output).await),
            None => None,
        }
    }
}

impl<R, E> fmt::Debug for Step<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("reversible", &self.undo.is_some())
            .finish_non_exhaustive()
    }
}

use std::marker::PhantomData;

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::step::{StepAction, StepFuture, StepUndo};

pub(crate) struct FnAction<F, R, E> {
    action: F,
    _marker: PhantomData<fn() -> (R, E)>,
}

impl<F, R, E> FnAction<F, R, E>
where
    F: for<'a> Fn(&'a ExecutionContext<R>) -> StepFuture<'a, Result<R, E>> + Send + Sync,
{
    pub(crate) fn new(action: F) -> Self {
        Self {
            action,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, R, E> StepAction<R, E> for FnAction<F, R, E>
where
    F: for<'a> Fn(&'a ExecutionContext<R>) -> StepFuture<'a, Result<R, E>> + Send + Sync,
    R: Send + Sync + 'static,
    E: Send + 'static,
{
    async fn execute(&self, ctx: &ExecutionContext<R>) -> Result<R, E> {
        (self.action)(ctx).await
    }
}

pub(crate) struct FnUndo<F, R, E> {
    undo: F,
    _marker: PhantomData<fn() -> (R, E)>,
}

impl<F, R, E> FnUndo<F, R, E>
where
    F: for<'a> Fn(&'a ExecutionContext<R>, &'a R) -> StepFuture<'a, Result<(), E>> + Send + Sync,
{
    pub(crate) fn new(undo: F) -> Self {
        Self {
            undo,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, R, E> StepUndo<R, E> for FnUndo<F, R, E>
where
    F: for<'a> Fn(&'a ExecutionContext<R>, &'a R) -> StepFuture<'a, Result<(), E>> + Send + Sync,
    R: Send + Sync + 'static,
    E: Send + 'static,
{
    async fn compensate(&self, ctx: &ExecutionContext<R>, output: &R) -> Result<(), E> {
        (self.undo)(ctx, output).await
    }
}

use std::time::Instant;

use crate::audit::AuditLog;
use crate::builder::Transaction;
use crate::context::ExecutionContext;
use crate::outcome::{Failure, Outcome, UndoAttempt};
use crate::step::Step;

/// Runs transactions to completion.
///
/// Steps execute strictly one after another. If a step fails, previously
/// completed steps are compensated in reverse order (LIFO). The executor
/// keeps no state between runs, so one instance can drive any number of
/// independent transactions concurrently.
#[derive(Debug, Default, Clone, Copy)]
pub struct Executor;

impl Executor {
    /// Create an executor. It holds no state.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Execute the transaction and report how it ended.
    ///
    /// Step failures and compensation failures are reported through the
    /// returned [`Outcome`]; this never fails on its own.
    pub async fn execute<R, E>(&self, transaction: Transaction<R, E>) -> Outcome<R, E>
    where
        R: Send + Sync + 'static,
        E: Send + 'static,
    {
        let mut audit_log = AuditLog::new();
        Self::execute_internal(&transaction, &mut audit_log).await
    }

    /// Execute the transaction and return both the outcome and an audit log.
    pub async fn execute_with_audit<R, E>(
        &self,
        transaction: Transaction<R, E>,
    ) -> (Outcome<R, E>, AuditLog)
    where
        R: Send + Sync + 'static,
        E: Send + 'static,
    {
        let mut audit_log = AuditLog::new();
        let outcome = Self::execute_internal(&transaction, &mut audit_log).await;
        (outcome, audit_log)
    }

    async fn execute_internal<R, E>(
        transaction: &Transaction<R, E>,
        audit_log: &mut AuditLog,
    ) -> Outcome<R, E>
    where
        R: Send + Sync + 'static,
        E: Send + 'static,
    {
        let steps = transaction.steps();
        let mut ctx = ExecutionContext::new();

        for (index, step) in steps.iter().enumerate() {
            let started = Instant::now();

            match step.execute(&ctx).await {
                Ok(response) => {
                    let description = step
                        .is_reversible()
                        .then(|| step.compensation_description());
                    audit_log.action_finished(step.id(), started, Ok(description));
                    ctx.record(step.id(), response);
                }
                Err(error) => {
                    audit_log.action_finished(step.id(), started, Err(()));
                    let undo_info = Self::compensate(&steps[..index], &ctx, audit_log).await;
                    return Outcome::Failed(Failure::new(
                        step.id().to_string(),
                        error,
                        undo_info,
                        ctx.into_responses(),
                    ));
                }
            }
        }

        Outcome::Succeeded {
            responses: ctx.into_responses(),
        }
    }

    async fn compensate<R, E>(
        completed: &[Step<R, E>],
        ctx: &ExecutionContext<R>,
        audit_log: &mut AuditLog,
    ) -> Vec<UndoAttempt<E>>
    where
        R: Send + Sync + 'static,
        E: Send + 'static,
    {
        let mut undo_info = Vec::new();

        for step in completed.iter().rev() {
            let Some(output) = ctx.get(step.id()) else {
                continue;
            };
            let Some(result) = step.compensate(ctx, output).await else {
                continue;
            };

            audit_log.undo_finished(step.id(), result.is_ok());
            undo_info.push(UndoAttempt::new(
                step.id().to_string(),
                step.compensation_description(),
                result,
            ));
        }

        undo_info
    }
}

//! Multi-step transactions with automatic compensation.
//!
//! A [`Transaction`] is an ordered list of [`Step`]s. The [`Executor`] runs the
//! steps one at a time, recording each result in an [`ExecutionContext`] that
//! later steps can read. If a step fails, every step that already completed is
//! compensated in reverse order and the run ends with a failed [`Outcome`]
//! carrying the full undo ledger.

mod audit;
mod builder;
mod context;
mod error;
mod executor;
mod fn_step;
mod outcome;
mod step;

pub use audit::{AuditLog, StepRecord, StepStatus};
pub use builder::{Transaction, TransactionBuilder};
pub use context::ExecutionContext;
pub use error::{ConstructionError, TransactionError};
pub use executor::Executor;
pub use outcome::{ErrorInfo, Failure, Outcome, OutcomeKind, UndoAttempt};
pub use step::{Step, StepAction, StepFuture, StepUndo};

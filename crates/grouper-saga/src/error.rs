use std::fmt::Debug;

use thiserror::Error;

use crate::outcome::UndoAttempt;

/// A transaction definition was rejected before any step ran.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConstructionError {
    #[error("transaction has no steps")]
    Empty,

    #[error("step at position {index} has an empty id")]
    EmptyStepId { index: usize },

    #[error("duplicate step id '{id}'")]
    DuplicateStepId { id: String },
}

/// Error form of a failed transaction run.
///
/// Both variants carry the complete undo ledger, in the order the undos were
/// attempted.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransactionError<E: Debug> {
    /// A step failed and all compensations succeeded.
    #[error("step '{step}' failed")]
    StepFailed {
        /// Id of the step that failed.
        step: String,
        /// The error that caused the step to fail.
        #[source]
        source: E,
        /// Undo attempts, all successful.
        undo_info: Vec<UndoAttempt<E>>,
    },

    /// A step failed and at least one compensation also failed.
    ///
    /// External state is inconsistent and needs manual reconciliation.
    #[error(
        "step '{failed_step}' failed, and {} compensation(s) also failed",
        undo_info.iter().filter(|attempt| !attempt.is_success()).count()
    )]
    CompensationFailed {
        /// Id of the step that originally failed.
        failed_step: String,
        /// The error from the failed step.
        step_error: E,
        /// Every undo attempt, successful or not.
        undo_info: Vec<UndoAttempt<E>>,
    },
}

impl<E: Debug> TransactionError<E> {
    /// Id of the step whose action failed.
    #[must_use]
    pub fn failed_step(&self) -> &str {
        match self {
            Self::StepFailed { step, .. } => step,
            Self::CompensationFailed { failed_step, .. } => failed_step,
        }
    }

    /// Every undo attempt, in the order it ran.
    #[must_use]
    pub fn undo_info(&self) -> &[UndoAttempt<E>] {
        match self {
            Self::StepFailed { undo_info, .. } | Self::CompensationFailed { undo_info, .. } => {
                undo_info
            }
        }
    }

    /// Undo attempts that failed, in attempt order.
    pub fn failed_compensations(&self) -> impl Iterator<Item = &UndoAttempt<E>> {
        self.undo_info()
            .iter()
            .filter(|attempt| !attempt.is_success())
    }

    /// Whether an undo failed and external state may be inconsistent.
    #[must_use]
    pub fn requires_reconciliation(&self) -> bool {
        matches!(self, Self::CompensationFailed { .. })
    }
}

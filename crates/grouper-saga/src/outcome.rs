use std::fmt::Debug;

use indexmap::IndexMap;

use crate::error::TransactionError;

/// Record of one compensation attempt.
#[derive(Debug)]
pub struct UndoAttempt<E> {
    step_id: String,
    description: String,
    result: Result<(), E>,
}

impl<E> UndoAttempt<E> {
    pub(crate) fn new(step_id: String, description: String, result: Result<(), E>) -> Self {
        Self {
            step_id,
            description,
            result,
        }
    }

    /// Id of the step whose undo ran.
    #[must_use]
    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    /// Description of what the compensation was trying to do.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the undo succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    #[must_use]
    pub fn error(&self) -> Option<&E> {
        self.result.as_ref().err()
    }

    #[must_use]
    pub fn result(&self) -> &Result<(), E> {
        &self.result
    }

    pub fn into_result(self) -> Result<(), E> {
        self.result
    }
}

/// The step whose action failed, and why.
#[derive(Debug)]
pub struct ErrorInfo<E> {
    step_id: String,
    error: E,
}

impl<E> ErrorInfo<E> {
    #[must_use]
    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    #[must_use]
    pub fn error(&self) -> &E {
        &self.error
    }
}

/// Failure report of a transaction run.
#[derive(Debug)]
pub struct Failure<R, E> {
    error_info: ErrorInfo<E>,
    undo_info: Vec<UndoAttempt<E>>,
    completed: IndexMap<String, R>,
}

impl<R, E> Failure<R, E> {
    pub(crate) fn new(
        step_id: String,
        error: E,
        undo_info: Vec<UndoAttempt<E>>,
        completed: IndexMap<String, R>,
    ) -> Self {
        Self {
            error_info: ErrorInfo { step_id, error },
            undo_info,
            completed,
        }
    }

    #[must_use]
    pub fn error_info(&self) -> &ErrorInfo<E> {
        &self.error_info
    }

    /// Undo attempts in the order they ran (reverse completion order).
    ///
    /// Steps without an undo do not appear here.
    #[must_use]
    pub fn undo_info(&self) -> &[UndoAttempt<E>] {
        &self.undo_info
    }

    /// Results of the steps that completed before the failure.
    #[must_use]
    pub fn completed(&self) -> &IndexMap<String, R> {
        &self.completed
    }

    /// Whether at least one undo failed.
    #[must_use]
    pub fn compensation_failed(&self) -> bool {
        self.undo_info.iter().any(|attempt| !attempt.is_success())
    }
}

/// How a transaction run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Succeeded,
    /// A step failed and every undo succeeded.
    RolledBack,
    /// A step failed and at least one undo failed as well.
    CompensationFailed,
}

/// Terminal report of a transaction run.
#[derive(Debug)]
#[must_use]
pub enum Outcome<R, E> {
    Succeeded {
        /// One entry per step, in execution order.
        responses: IndexMap<String, R>,
    },
    Failed(Failure<R, E>),
}

impl<R, E> Outcome<R, E> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Which of the three endings this run had.
    #[must_use]
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Succeeded { .. } => OutcomeKind::Succeeded,
            Self::Failed(failure) if failure.compensation_failed() => {
                OutcomeKind::CompensationFailed
            }
            Self::Failed(_) => OutcomeKind::RolledBack,
        }
    }

    /// Step responses, only when every step succeeded.
    #[must_use]
    pub fn responses(&self) -> Option<&IndexMap<String, R>> {
        match self {
            Self::Succeeded { responses } => Some(responses),
            Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn failure(&self) -> Option<&Failure<R, E>> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed(failure) => Some(failure),
        }
    }

    /// Convert into a `Result`, keeping the full undo ledger on failure.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::StepFailed`] after a clean rollback and
    /// [`TransactionError::CompensationFailed`] when any undo failed.
    pub fn into_result(self) -> Result<IndexMap<String, R>, TransactionError<E>>
    where
        E: Debug,
    {
        match self {
            Self::Succeeded { responses } => Ok(responses),
            Self::Failed(failure) => {
                let compensation_failed = failure.compensation_failed();
                let Failure {
                    error_info: ErrorInfo { step_id, error },
                    undo_info,
                    ..
                } = failure;

                if compensation_failed {
                    Err(TransactionError::CompensationFailed {
                        failed_step: step_id,
                        step_error: error,
                        undo_info,
                    })
                } else {
                    Err(TransactionError::StepFailed {
                        step: step_id,
                        source: error,
                        undo_info,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(undo_results: Vec<(&str, Result<(), String>)>) -> Outcome<u32, String> {
        let undo_info = undo_results
            .into_iter()
            .map(|(id, result)| UndoAttempt::new(id.to_string(), format!("undo {id}"), result))
            .collect();
        let mut completed = IndexMap::new();
        completed.insert("insert".to_string(), 1);
        Outcome::Failed(Failure::new(
            "groupsCreate".to_string(),
            "directory down".to_string(),
            undo_info,
            completed,
        ))
    }

    #[test]
    fn success_exposes_responses() {
        let mut responses = IndexMap::new();
        responses.insert("insert".to_string(), 1);
        let outcome: Outcome<u32, String> = Outcome::Succeeded { responses };

        assert!(outcome.is_success());
        assert_eq!(outcome.kind(), OutcomeKind::Succeeded);
        assert!(outcome.failure().is_none());
        assert_eq!(outcome.responses().and_then(|r| r.get("insert")), Some(&1));
    }

    #[test]
    fn clean_rollback_is_rolled_back_kind() {
        let outcome = failure(vec![("insert", Ok(()))]);

        assert!(!outcome.is_success());
        assert_eq!(outcome.kind(), OutcomeKind::RolledBack);
        let failure = outcome.failure().expect("failed outcome");
        assert_eq!(failure.error_info().step_id(), "groupsCreate");
        assert_eq!(failure.error_info().error(), "directory down");
        assert_eq!(failure.completed().get("insert"), Some(&1));
        assert!(!failure.compensation_failed());
    }

    #[test]
    fn failed_undo_is_compensation_failed_kind() {
        let outcome = failure(vec![("insert", Err("row locked".to_string()))]);

        assert_eq!(outcome.kind(), OutcomeKind::CompensationFailed);
        let attempt = &outcome.failure().expect("failed outcome").undo_info()[0];
        assert_eq!(attempt.step_id(), "insert");
        assert_eq!(attempt.description(), "undo insert");
        assert!(!attempt.is_success());
        assert_eq!(attempt.error().map(String::as_str), Some("row locked"));
    }

    #[test]
    fn failure_without_undos_is_rolled_back() {
        let outcome = failure(Vec::new());

        assert_eq!(outcome.kind(), OutcomeKind::RolledBack);
    }

    #[test]
    fn into_result_maps_kinds_to_error_variants() {
        let clean = failure(vec![("insert", Ok(()))]).into_result();
        assert!(matches!(
            clean,
            Err(TransactionError::StepFailed { ref step, .. }) if step == "groupsCreate"
        ));

        let dirty = failure(vec![("insert", Err("row locked".to_string()))]).into_result();
        match dirty {
            Err(TransactionError::CompensationFailed {
                failed_step,
                undo_info,
                ..
            }) => {
                assert_eq!(failed_step, "groupsCreate");
                assert_eq!(undo_info.len(), 1);
            }
            other => panic!("expected CompensationFailed, got {other:?}"),
        }
    }
}

use std::time::Duration;

use grouper_core::{RequestId, RequestStatus, UserId};
use grouper_saga::{ConstructionError, TransactionError};
use thiserror::Error;

/// Details about a failed compensation during rollback.
#[derive(Debug)]
pub struct CompensationFailure {
    /// Id of the step whose compensation failed.
    pub step: String,
    /// Description of what the compensation was trying to do.
    pub description: String,
    /// The error that occurred during compensation.
    pub error: Box<OperationError>,
}

#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Core(#[from] grouper_core::CoreError),

    #[error("invalid request transaction")]
    Transaction(#[from] ConstructionError),

    #[error("request store error: {0}")]
    Store(String),

    #[error("a request from '{creator}' to '{approver}' for this group already exists")]
    DuplicateRequest { creator: UserId, approver: UserId },

    #[error("request '{0}' not found")]
    RequestNotFound(RequestId),

    #[error("request '{id}' is {actual}, expected {expected}")]
    StatusConflict {
        id: RequestId,
        expected: RequestStatus,
        actual: RequestStatus,
    },

    #[error("directory error: {0}")]
    Directory(String),

    #[error("failed to create a group: {message}")]
    ProvisioningRejected { message: String },

    #[error("directory did not answer within {}s", timeout.as_secs())]
    DirectoryTimeout { timeout: Duration },

    #[error("approver lookup failed: {0}")]
    ApproverLookup(String),

    #[error("the approver is supposed to be in the user's hierarchy and {minimum_rank} and up")]
    InvalidApprover {
        approver: UserId,
        minimum_rank: &'static str,
    },

    #[error("notification failed: {0}")]
    Notification(String),

    #[error("step '{step}' returned an unexpected response")]
    UnexpectedResponse { step: String },

    #[error("request saga failed at step '{step}'")]
    SagaFailed {
        step: String,
        #[source]
        source: Box<OperationError>,
        /// Steps that were undone, in the order they were undone.
        compensated: Vec<String>,
    },

    #[error(
        "request saga failed at step '{step}' and {} compensation(s) also failed", compensation_failures.len()
    )]
    SagaCompensationFailed {
        step: String,
        source: Box<OperationError>,
        compensation_failures: Vec<CompensationFailure>,
    },

    /// A transaction ending without a dedicated mapping, kept as is.
    #[error("request saga failed at step '{}'", .0.failed_step())]
    Saga(#[source] Box<TransactionError<OperationError>>),
}

impl OperationError {
    /// Whether external state may be inconsistent and needs an operator.
    #[must_use]
    pub fn requires_reconciliation(&self) -> bool {
        match self {
            Self::SagaCompensationFailed { .. } => true,
            Self::Saga(err) => err.requires_reconciliation(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, OperationError>;

impl From<TransactionError<OperationError>> for OperationError {
    fn from(err: TransactionError<OperationError>) -> Self {
        match err {
            TransactionError::StepFailed {
                step,
                source,
                undo_info,
            } => Self::SagaFailed {
                step,
                source: Box::new(source),
                compensated: undo_info
                    .iter()
                    .map(|attempt| attempt.step_id().to_string())
                    .collect(),
            },
            TransactionError::CompensationFailed {
                failed_step,
                step_error,
                undo_info,
            } => {
                let compensation_failures = undo_info
                    .into_iter()
                    .filter_map(|attempt| {
                        let step = attempt.step_id().to_string();
                        let description = attempt.description().to_string();
                        attempt.into_result().err().map(|error| CompensationFailure {
                            step,
                            description,
                            error: Box::new(error),
                        })
                    })
                    .collect();
                Self::SagaCompensationFailed {
                    step: failed_step,
                    source: Box::new(step_error),
                    compensation_failures,
                }
            }
            other => Self::Saga(Box::new(other)),
        }
    }
}

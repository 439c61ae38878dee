pub mod approvers;
mod error;
pub mod notify;
pub mod operations;
pub mod providers;
pub mod traits;
mod types;

#[cfg(test)]
pub mod mocks;

pub use error::{CompensationFailure, OperationError, Result};
pub use types::{
    Approver, ProvisionResponse, RequestEvent, RequestFilter, StatusTransition, StepResponse,
};

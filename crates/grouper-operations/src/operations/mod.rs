mod approve;
mod create;
mod deny;
mod join;
mod list;
mod steps;
mod transaction;

pub use approve::ApproveCreateOperation;
pub use create::{CreateGroupInput, CreateGroupOperation, CreateGroupOutcome};
pub use deny::DenyRequestOperation;
pub use join::{JoinGroupInput, JoinGroupOperation};
pub use list::ListRequestsOperation;

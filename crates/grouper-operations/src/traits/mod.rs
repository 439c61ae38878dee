mod approver;
mod directory;
mod notifier;
mod request_store;

pub use approver::{ApproverValidator, DefaultApproverSource};
pub use directory::DirectoryProvisioner;
pub use notifier::Notifier;
pub use request_store::RequestStore;

pub mod config;
pub mod error;
pub mod types;

pub use config::{ApproverCacheConfig, DirectoryConfig, GrouperConfig};
pub use error::*;
pub use types::*;

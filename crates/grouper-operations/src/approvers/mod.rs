mod cache;

pub use cache::{DefaultApproverCache, DefaultApproverValidator};

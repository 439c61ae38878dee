mod memory;
mod tracing_notifier;

pub use memory::InMemoryRequestStore;
pub use tracing_notifier::TracingNotifier;

pub mod maintenance;
pub mod query;
pub mod serve;

// Re-export command functions for convenience
pub use maintenance::{check_config, sweep};
pub use query::{availability, unavailable_days, AvailabilityParams};
pub use serve::serve;

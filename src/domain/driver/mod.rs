//! Driver domain module: live records and connection-scoped filters.

mod record;
mod subscription;

pub use record::{ApprovalState, Availability, Capabilities, DriverRecord, LocationFix};
pub use subscription::DriverSubscription;

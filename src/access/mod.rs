/// Access-window gating for sequential daily content
///
/// This module provides functionality to:
/// - Persist per-subject last-grant records
/// - Decide grant/deny against the daily reset-hour boundary
/// - Report the remaining wait until the next window opens
/// - Reset a subject back to the start of its sequence

pub mod format;
pub mod record;
pub mod scheduler;
pub mod store;

pub use record::{AccessMap, GrantRecord, SubjectKey};
pub use scheduler::{AccessDescription, AccessScheduler, Decision, WindowState};
pub use store::AccessStore;

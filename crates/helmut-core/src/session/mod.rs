//! Session coordination between the timer, the task list and alerts.

mod coordinator;

pub use coordinator::SessionCoordinator;

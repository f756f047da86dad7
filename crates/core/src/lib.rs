//! Conveyor domain types.
//!
//! Pure data and validation: the task record, execution outcomes, the
//! result event pushed to subscribers, and the submission contract. No I/O
//! lives here.

pub mod error;
pub mod messages;
pub mod task;
pub mod types;

//! Conveyor task execution.
//!
//! - [`QueueCoordinator`]: owns the FIFO backlog and drives at most one
//!   execution unit at a time, publishing every result to the
//!   [`ResultBroadcaster`](conveyor_events::ResultBroadcaster).
//! - [`unit`]: spawns one task into an isolated context and turns whatever
//!   happens there (output, error, panic, silence) into a single result.
//! - [`Executor`]: the work a unit performs. [`SimulatedExecutor`] runs in
//!   process; [`CommandExecutor`] runs each task in a child process (for
//!   example the `conveyor-worker` binary).

pub mod command;
pub mod config;
pub mod coordinator;
pub mod executor;
pub mod simulated;
pub mod unit;

pub use command::CommandExecutor;
pub use config::WorkerConfig;
pub use coordinator::{QueueCoordinator, QueueError, QueueHandle, QueueStatus};
pub use executor::{ExecutionError, Executor};
pub use simulated::SimulatedExecutor;

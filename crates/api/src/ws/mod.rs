//! WebSocket result subscription.
//!
//! Every connected client is a subscriber of the
//! [`ResultBroadcaster`](conveyor_events::ResultBroadcaster) for as long as
//! its socket is open. There is no filtering: every client sees every
//! result published while it is connected.

mod frame;
mod handler;

pub use frame::result_frame;
pub use handler::ws_handler;

//! Conveyor result fan-out.
//!
//! - [`ResultBroadcaster`]: the live subscriber set and best-effort
//!   delivery of every [`ResultEvent`](conveyor_core::task::ResultEvent)
//!   to whoever is connected at publish time.
//! - [`Subscription`]: a registered listener's receiving end.

pub mod broadcaster;

pub use broadcaster::{DeliveryFailure, ResultBroadcaster, Subscription};

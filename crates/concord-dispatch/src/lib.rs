//! # Concord Dispatch
//!
//! Delivery of corrective instructions to logistics participants. A
//! [`Dispatcher`] addresses one [`CorrectiveInstruction`] at a participant
//! and drives it through a [`DeliveryChannel`] under a bounded
//! [`RetryPolicy`]; transient failures retry with multiplicative backoff,
//! permanent refusals stop immediately.
//!
//! Exhaustion is deliberately soft: an undeliverable instruction resolves to
//! [`DispatchOutcome::Blocked`] rather than an error, and the caller books it
//! as accumulating systemic waste.

pub mod channel;
pub mod dispatcher;
pub mod retry;

pub use channel::{DeliveryChannel, DeliveryError, HttpChannel};
pub use dispatcher::{CorrectiveInstruction, DispatchOutcome, Dispatcher};
pub use retry::RetryPolicy;

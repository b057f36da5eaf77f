//! Concurrency primitives shared by subscriptions and event sources.
//!
//! - [`OnceFlag`]: a boolean that flips `false -> true` exactly once, used to
//!   gate teardown that must run a single time across racing callers.
//! - [`CancellationToken`]: cooperative cancellation passed by reference into
//!   every call that may block.
//! - [`Cancellable`]: the result of a blocking call that can be interrupted.

mod cancel;
mod once;

pub use cancel::{Cancellable, CancellationToken};
pub use once::OnceFlag;

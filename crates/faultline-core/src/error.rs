//! # Error Types
//!
//! General error handling for the crash monitor core.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Most failure modes in this crate deliberately do *not* surface as error
//! values: a thread that is already handling a fault must never block, retry,
//! or unwind, so lock contention and re-entrant crashes degrade silently with
//! a log line instead. The variants below cover the paths where the caller is
//! in a sane context and can actually react: monitor registration and event
//! identifier exhaustion.

use thiserror::Error;

/// Main error type for crash monitor operations
///
/// ## Error Categories
///
/// 1. **Configuration errors**: EmptyMonitorId, DuplicateMonitor. Rejected
///    synchronously at registration time, no state is mutated.
/// 2. **Resource errors**: EventIdsExhausted. The pre-built identifier pool
///    ran dry, which only happens after repeated nested fatal episodes.
#[derive(Error, Debug)]
pub enum FaultlineError
{
    /// A monitor reported an empty identifier at registration
    ///
    /// Every monitor must expose a stable, non-empty `id()`. Registration is
    /// rejected before any state changes and before `init` is invoked.
    #[error("Monitor has an empty id")]
    EmptyMonitorId,

    /// A monitor with the same identifier is already registered
    ///
    /// Monitor identifiers are unique keys. The duplicate is rejected without
    /// re-invoking `init` on either descriptor.
    #[error("Monitor {0:?} is already registered")]
    DuplicateMonitor(String),

    /// Both pre-generated event identifiers have been consumed
    ///
    /// The async-safe handling path draws identifiers from a fixed two-slot
    /// pool (crash + recrash) because it must not synthesize entropy inside a
    /// signal handler. Running out means the process is stuck in a handler
    /// loop; handling aborts rather than looping or blocking.
    #[error("Pre-built event identifiers exhausted")]
    EventIdsExhausted,
}

/// Convenience type alias for `Result<T, FaultlineError>`
pub type FaultlineResult<T> = std::result::Result<T, FaultlineError>;

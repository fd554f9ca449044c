//! # faultline-core
//!
//! Crash monitor coordination and exception handling primitives for
//! Faultline.
//!
//! This crate is the core of the crash reporter: it registers independent
//! fault-detection plugins ("monitors": signal handlers, kernel exception
//! listeners, language-exception hooks, watchdogs), arms or disarms them
//! under runtime safety constraints, and drives the two-phase notify/handle
//! protocol that captures exactly one crash event per fatal condition, even
//! when the handling code itself faults.
//!
//! What this crate deliberately does *not* do: implement any concrete
//! monitor, serialize or persist reports, unwind stacks, or symbolicate.
//! Those live in their own crates and plug in through the [`Monitor`] trait,
//! the [`ReportWriter`] visitor, and the application-level event callback.
//!
//! ## Safety constraints
//!
//! The handling path may execute inside a signal handler on whichever thread
//! faulted. Everything on that path avoids heap allocation and blocking
//! locks: event identifiers come from a pool pre-built outside of fault
//! context, the registry lock is only ever *tried*, and every failure mode
//! degrades to a log line rather than a retry, because the process may
//! already be in a corrupted, soon-to-terminate state.
//!
//! ## Why unsafe code is needed
//!
//! The debugger probe calls `sysctl` on macOS to read the process's traced
//! flag. That single FFI call is the only unsafe code in the crate.

#![allow(unsafe_code)] // Required for the sysctl-based debugger probe on macOS.

pub mod context;
pub mod debug;
pub mod error;
pub mod event_id;
pub mod monitor;
pub mod policy;
mod registry;
pub mod system;
pub mod writer;

pub use context::{EventContext, KernelExceptionInfo, LanguageExceptionInfo, SignalInfo};
pub use debug::is_being_traced;
// Re-export commonly used types
pub use error::{FaultlineError, FaultlineResult};
pub use event_id::{EventId, EventIdPool, EVENT_ID_POOL_CAPACITY};
pub use monitor::{Monitor, MonitorFlags};
pub use policy::ExceptionHandlingPolicy;
pub use system::{EventCallback, ExceptionHandlerCallbacks, MonitorSystem};
pub use writer::ReportWriter;

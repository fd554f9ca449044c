//! # Event Context
//!
//! The mutable record that accumulates crash facts before handoff to
//! serialization.
//!
//! One context is created per fault occurrence and passed by reference to
//! every enabled monitor during handling. Each monitor writes only into its
//! own namespaced section; the shared fields are stamped by the protocol
//! itself. The context is destroyed after the application callback returns;
//! nothing here is persisted by the core.
//!
//! Sections that can be filled from a signal handler hold only `Copy` values
//! so that writing them never allocates. The language-exception section
//! carries owned strings and is reserved for the synchronous, non-async path.

use crate::event_id::EventId;

/// Facts recorded by a signal-based monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignalInfo
{
    /// Signal number (e.g. `SIGSEGV`).
    pub number: Option<i32>,
    /// Signal code (`si_code`), qualifying the signal.
    pub code: Option<i32>,
    /// Faulting address, when the signal carries one.
    pub fault_address: Option<u64>,
}

/// Facts recorded by a kernel-level exception monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KernelExceptionInfo
{
    /// Kernel exception type.
    pub exception_type: Option<i32>,
    /// Primary exception code.
    pub code: Option<i64>,
    /// Secondary exception code, when the kernel provides one.
    pub subcode: Option<i64>,
}

/// Facts recorded by a language-exception monitor.
///
/// Owned strings: populated only on the synchronous handling path, where
/// allocation is permitted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LanguageExceptionInfo
{
    /// Exception class or type name.
    pub name: Option<String>,
    /// Human-readable reason attached to the exception.
    pub reason: Option<String>,
}

/// In-memory record of a single crash event.
///
/// ## Shared fields
///
/// - `event_id`: resolved by the protocol during handling: freshly generated
///   on the synchronous path, drawn from the pre-built pool on the
///   async-constrained path. `None` until then.
/// - `handling_crash`: true while a fatal event is being handled; cleared
///   before `handle` returns.
/// - `requires_async_safety`: snapshot of the merged policy at handling time.
/// - `crashed_during_crash_handling`: true when this event was produced by a
///   fault inside the crash handler itself.
///
/// Monitors must tolerate being invoked while the shared fields are only
/// partially populated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventContext
{
    /// Unique identifier for this event, resolved during handling.
    pub event_id: Option<EventId>,
    /// A fatal event is currently being handled.
    pub handling_crash: bool,
    /// Handling must remain async-signal-safe.
    pub requires_async_safety: bool,
    /// This event came from a fault inside the crash handler.
    pub crashed_during_crash_handling: bool,
    /// Section owned by signal-based monitors.
    pub signal: SignalInfo,
    /// Section owned by kernel-exception monitors.
    pub kernel: KernelExceptionInfo,
    /// Section owned by language-exception monitors.
    pub exception: LanguageExceptionInfo,
}

impl EventContext
{
    /// Create an empty context for a new fault occurrence.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }
}

//! # Exception Handling Policy
//!
//! The process-wide policy flags that gate crash handling, plus the
//! per-monitor arming decision.
//!
//! The policy is tiny on purpose: two flags describing the current episode
//! (`is_fatal`, `async_safety`) and one sticky marker for a crash that
//! occurred inside the crash handler itself. Fault sites pass a policy value
//! as a *recommendation* to `notify`; the core merges it into the global
//! state with monotonic, commutative operations so that racing fatal
//! notifications from multiple threads converge to the same terminal state
//! regardless of arrival order.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::monitor::MonitorFlags;

/// Policy recommendation passed by a fault site, and snapshot of the global
/// policy state.
///
/// - `is_fatal`: the detected condition is expected to terminate the process
///   once handling completes.
/// - `async_safety`: handling must stay async-signal-safe (no heap
///   allocation, no blocking locks, no entropy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExceptionHandlingPolicy
{
    /// The condition will terminate the process after handling.
    pub is_fatal: bool,
    /// Handling must avoid allocation, blocking, and non-reentrant calls.
    pub async_safety: bool,
}

impl ExceptionHandlingPolicy
{
    /// Recommendation for a fatal condition.
    #[must_use]
    pub const fn fatal(async_safety: bool) -> Self
    {
        Self {
            is_fatal: true,
            async_safety,
        }
    }

    /// Recommendation for a non-fatal diagnostic event.
    #[must_use]
    pub const fn non_fatal(async_safety: bool) -> Self
    {
        Self {
            is_fatal: false,
            async_safety,
        }
    }
}

/// Global policy state for the current episode.
///
/// The flags are written without locking: at most one fatal episode is active
/// at a time, and all merges are monotonic (`is_fatal` only ever sets,
/// `async_safety` only ever ORs), so plain atomic stores are sufficient. This
/// is a documented trade-off, not a guarantee the type enforces.
#[derive(Debug, Default)]
pub(crate) struct PolicyState
{
    is_fatal: AtomicBool,
    async_safety: AtomicBool,
    crashed_during_handling: AtomicBool,
}

impl PolicyState
{
    /// OR an async-safety requirement into the episode. Never unsets.
    pub(crate) fn merge_async_safety(&self, required: bool)
    {
        if required {
            self.async_safety.store(true, Ordering::SeqCst);
        }
    }

    /// Mark the episode fatal, returning whether it already was.
    ///
    /// The atomic swap is what detects a re-entrant fatality: a second fatal
    /// notification observes the sticky `true` left by the first.
    pub(crate) fn record_fatal(&self) -> bool
    {
        self.is_fatal.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn is_fatal(&self) -> bool
    {
        self.is_fatal.load(Ordering::SeqCst)
    }

    pub(crate) fn async_safety(&self) -> bool
    {
        self.async_safety.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_crashed_during_handling(&self)
    {
        self.crashed_during_handling.store(true, Ordering::SeqCst);
    }

    pub(crate) fn crashed_during_handling(&self) -> bool
    {
        self.crashed_during_handling.load(Ordering::SeqCst)
    }

    /// Explicitly clear the async-safety requirement between episodes.
    pub(crate) fn clear_async_safety(&self)
    {
        self.async_safety.store(false, Ordering::SeqCst);
    }

    /// Return the episode to its idle state. Test harnesses only.
    pub(crate) fn reset(&self)
    {
        self.is_fatal.store(false, Ordering::SeqCst);
        self.async_safety.store(false, Ordering::SeqCst);
        self.crashed_during_handling.store(false, Ordering::SeqCst);
    }
}

/// Per-monitor arming decision.
///
/// A monitor stays disarmed while a debugger is attached if it is flagged
/// [`MonitorFlags::DEBUGGER_UNSAFE`], and while async-safety is required if
/// it lacks [`MonitorFlags::ASYNC_SAFE`]. Everything else is armed.
pub(crate) fn should_enable_monitor(flags: MonitorFlags, debugger_attached: bool, async_safety_required: bool)
    -> bool
{
    if debugger_attached && flags.contains(MonitorFlags::DEBUGGER_UNSAFE) {
        return false;
    }

    if async_safety_required && !flags.contains(MonitorFlags::ASYNC_SAFE) {
        return false;
    }

    true
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_should_enable_with_no_constraints()
    {
        assert!(should_enable_monitor(MonitorFlags::NONE, false, false));
        assert!(should_enable_monitor(MonitorFlags::DEBUGGER_UNSAFE, false, false));
    }

    #[test]
    fn test_debugger_masks_debugger_unsafe_monitors()
    {
        assert!(!should_enable_monitor(MonitorFlags::DEBUGGER_UNSAFE, true, false));
        assert!(should_enable_monitor(MonitorFlags::ASYNC_SAFE, true, false));
        let both = MonitorFlags::ASYNC_SAFE | MonitorFlags::DEBUGGER_UNSAFE;
        assert!(!should_enable_monitor(both, true, false));
    }

    #[test]
    fn test_async_safety_masks_unsafe_monitors()
    {
        assert!(!should_enable_monitor(MonitorFlags::NONE, false, true));
        assert!(should_enable_monitor(MonitorFlags::ASYNC_SAFE, false, true));
    }

    #[test]
    fn test_async_safety_merge_is_monotonic()
    {
        let state = PolicyState::default();
        state.merge_async_safety(false);
        assert!(!state.async_safety());

        state.merge_async_safety(true);
        state.merge_async_safety(false);
        assert!(state.async_safety(), "a later non-async recommendation must not unset the flag");

        state.clear_async_safety();
        assert!(!state.async_safety());
    }

    #[test]
    fn test_record_fatal_is_sticky()
    {
        let state = PolicyState::default();
        assert!(!state.record_fatal());
        assert!(state.record_fatal());
        assert!(state.is_fatal());

        state.reset();
        assert!(!state.is_fatal());
        assert!(!state.record_fatal());
    }
}

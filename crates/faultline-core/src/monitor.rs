//! # Monitor Trait
//!
//! The capability interface implemented by every crash-source plugin.
//!
//! A monitor is an independently authored fault detector: a signal handler, a
//! kernel-level exception listener, a language-exception hook, a watchdog.
//! The core never knows what a monitor watches; it only arms and disarms it
//! through this trait and asks it to annotate a crash event when one occurs.
//!
//! ## Why use a trait?
//!
//! The set of monitors is open-ended and heterogeneous. A fixed capability
//! trait lets the core drive any plugin without knowing its shape, and makes
//! every mandatory operation present by construction: there is no optional
//! function pointer to call through.
//!
//! ## Contract
//!
//! - `id()` must return a stable, non-empty identifier. Registration rejects
//!   empty ids and duplicates.
//! - `set_enabled`/`is_enabled` take `&self`: monitors are shared behind
//!   `Arc` and own their enabled flag via interior mutability (an
//!   `AtomicBool` is the usual choice).
//! - `add_contextual_info_to_event` may run inside a signal handler. It must
//!   write only plain values into its own section of the context and must
//!   tolerate partially-populated shared fields.

use crate::context::EventContext;
use crate::system::ExceptionHandlerCallbacks;

/// Behavioral flags reported by a monitor via [`Monitor::flags`].
///
/// The activation policy reads these to decide whether a monitor may be armed
/// in the current environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MonitorFlags(u32);

impl MonitorFlags
{
    /// No special behavior.
    pub const NONE: Self = Self(0);
    /// The monitor's fault path is async-signal-safe: no heap allocation, no
    /// non-reentrant locking, no unbounded operations.
    pub const ASYNC_SAFE: Self = Self(1 << 0);
    /// The monitor interferes with an attached debugger (e.g. it competes for
    /// the same exception ports or signals) and must stay disarmed while the
    /// process is being traced.
    pub const DEBUGGER_UNSAFE: Self = Self(1 << 1);

    /// Check whether every flag in `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool
    {
        (self.0 & other.0) == other.0
    }

    /// Combine two flag sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self
    {
        Self(self.0 | other.0)
    }

    /// True if no flags are set.
    #[must_use]
    pub const fn is_empty(self) -> bool
    {
        self.0 == 0
    }

    /// Raw bit representation (useful for logging).
    #[must_use]
    pub const fn bits(self) -> u32
    {
        self.0
    }
}

impl std::ops::BitOr for MonitorFlags
{
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self
    {
        self.union(rhs)
    }
}

/// Capability interface for a crash-source plugin.
///
/// ## Lifecycle
///
/// 1. The plugin is created by its author and registered with
///    [`MonitorSystem::add_monitor`](crate::MonitorSystem::add_monitor).
/// 2. `init` is invoked exactly once, on first successful registration,
///    handing the monitor the callback pair its fault sites will use.
/// 3. [`MonitorSystem::activate_monitors`](crate::MonitorSystem::activate_monitors)
///    arms or disarms it via `set_enabled` according to the activation
///    policy, then calls `notify_post_system_enable` on the armed ones.
/// 4. During crash handling, every enabled monitor gets
///    `add_contextual_info_to_event` with the event context.
/// 5. Removal disables the monitor; the core never mutates it otherwise.
pub trait Monitor: Send + Sync
{
    /// Stable, non-empty identifier for this monitor.
    fn id(&self) -> &str;

    /// Behavioral flags consumed by the activation policy.
    fn flags(&self) -> MonitorFlags
    {
        MonitorFlags::NONE
    }

    /// One-time setup, invoked on first successful registration.
    ///
    /// The callbacks are the monitor's only channel back into the core:
    /// its fault sites call `notify` and then `handle` on them. Monitors
    /// that install handlers lazily typically clone and store this value.
    fn init(&self, _callbacks: &ExceptionHandlerCallbacks) {}

    /// Arm or disarm the monitor.
    ///
    /// Implementations install or restore their platform hooks here (signal
    /// handlers, exception ports, ...). Must be idempotent.
    fn set_enabled(&self, enabled: bool);

    /// Whether the monitor is currently armed.
    fn is_enabled(&self) -> bool;

    /// Write this monitor's facts into its own section of the event context.
    ///
    /// May execute inside a signal handler; see the module docs for the
    /// constraints that apply.
    fn add_contextual_info_to_event(&self, _context: &mut EventContext) {}

    /// Called after an activation pass, outside the registry lock, on every
    /// monitor that ended up enabled.
    ///
    /// Safe place for follow-up work that needs the full monitor set armed;
    /// the implementation may log or even mutate the registry.
    fn notify_post_system_enable(&self) {}
}

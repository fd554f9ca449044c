//! # Monitor System
//!
//! The crash-monitor coordination core: monitor registration, the activation
//! policy, and the two-phase notify/handle exception protocol.
//!
//! This module owns the only shared mutable state in the crate: the monitor
//! list plus the pre-built event identifier pool (behind one mutex) and the
//! policy flags (lock-free atomics). The split matters: the `handle` path may
//! run inside a signal handler on whichever thread faulted, so it only ever
//! *tries* the lock and reads atomics, while registration and activation run
//! on ordinary threads and may block briefly.
//!
//! ## The two-phase protocol
//!
//! A fault site first calls [`notify`] with a policy recommendation. For a
//! fatal condition this escalates the global policy, and (if a fatal episode
//! was already in flight) detects the crash-inside-the-crash-handler case
//! and short-circuits straight to shutdown. The fault site then calls
//! [`handle`] with an [`EventContext`], which resolves an event identifier,
//! lets every enabled monitor annotate the context, and hands the completed
//! context to the single application-level callback.
//!
//! ## Process-wide instance
//!
//! Production call paths share one instance via [`MonitorSystem::global`].
//! Tests construct their own instances with [`MonitorSystem::new`] so they
//! never contend over process state; [`MonitorSystem::reset`] exists for
//! harnesses that must reuse one.
//!
//! [`notify`]: MonitorSystem::notify
//! [`handle`]: MonitorSystem::handle

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Once, PoisonError, TryLockError, Weak};

use once_cell::sync::Lazy;
use smallvec::SmallVec;
use tracing::{debug, error, info, warn};

use crate::context::EventContext;
use crate::debug::is_being_traced;
use crate::error::{FaultlineError, FaultlineResult};
use crate::event_id::{EventId, EventIdPool};
use crate::monitor::Monitor;
use crate::policy::{should_enable_monitor, ExceptionHandlingPolicy, PolicyState};
use crate::registry::MonitorRegistry;

/// Application-level callback receiving each completed event context.
pub type EventCallback = Arc<dyn Fn(&mut EventContext) + Send + Sync>;

static GLOBAL_SYSTEM: Lazy<Arc<MonitorSystem>> = Lazy::new(MonitorSystem::new);

/// State guarded by the single registry lock.
struct SystemState
{
    registry: MonitorRegistry,
    event_ids: EventIdPool,
}

/// The callback pair handed to every monitor at registration.
///
/// Fault sites inside a monitor call `notify` and then `handle` on this
/// value. It holds a weak reference to the owning system, so a monitor that
/// outlives its system degrades to a no-op instead of keeping the whole
/// coordination core alive.
#[derive(Debug, Clone)]
pub struct ExceptionHandlerCallbacks
{
    system: Weak<MonitorSystem>,
}

impl ExceptionHandlerCallbacks
{
    /// Forward a policy recommendation to [`MonitorSystem::notify`].
    ///
    /// Returns false when the owning system is gone.
    pub fn notify(&self, recommendation: ExceptionHandlingPolicy) -> bool
    {
        match self.system.upgrade() {
            Some(system) => system.notify(recommendation),
            None => false,
        }
    }

    /// Forward an event context to [`MonitorSystem::handle`].
    pub fn handle(&self, context: &mut EventContext)
    {
        if let Some(system) = self.system.upgrade() {
            system.handle(context);
        }
    }
}

/// Crash-monitor coordination core.
///
/// See the module documentation for the overall shape. All methods take
/// `&self`; the system is shared behind an `Arc` between the application,
/// the registered monitors, and any thread that may fault.
pub struct MonitorSystem
{
    state: Mutex<SystemState>,
    policy: PolicyState,
    callback: Mutex<Option<EventCallback>>,
    initialized: AtomicBool,
}

impl MonitorSystem
{
    /// Create a fresh, empty system.
    ///
    /// Production code normally uses [`MonitorSystem::global`]; separate
    /// instances exist for tests and embedding.
    #[must_use]
    pub fn new() -> Arc<Self>
    {
        Arc::new(Self {
            state: Mutex::new(SystemState {
                registry: MonitorRegistry::new(),
                event_ids: EventIdPool::new(),
            }),
            policy: PolicyState::default(),
            callback: Mutex::new(None),
            initialized: AtomicBool::new(false),
        })
    }

    /// The process-wide system shared by all production call paths.
    #[must_use]
    pub fn global() -> &'static Arc<MonitorSystem>
    {
        &GLOBAL_SYSTEM
    }

    /// The callback pair monitors use to reach back into this system.
    #[must_use]
    pub fn callbacks(self: &Arc<Self>) -> ExceptionHandlerCallbacks
    {
        ExceptionHandlerCallbacks {
            system: Arc::downgrade(self),
        }
    }

    /// Prepare the backing storage.
    ///
    /// Idempotent and race-safe: the first caller wins the compare-and-swap
    /// and reserves the registry's initial capacity, every later caller
    /// returns immediately. Invoked implicitly by registration, activation,
    /// and callback installation.
    pub fn initialize(&self)
    {
        self.ensure_initialized();
    }

    /// Install the application-level callback invoked with each completed
    /// event context.
    pub fn set_event_callback(&self, on_event: EventCallback)
    {
        self.ensure_initialized();
        *self.lock_callback() = Some(on_event);
    }

    /// Register a monitor.
    ///
    /// On first successful registration the monitor's `init` runs exactly
    /// once, receiving this system's [`ExceptionHandlerCallbacks`].
    ///
    /// ## Errors
    ///
    /// - [`FaultlineError::EmptyMonitorId`]: the monitor reports an empty id
    /// - [`FaultlineError::DuplicateMonitor`]: a monitor with the same id is
    ///   already registered (its `init` is not re-invoked)
    pub fn add_monitor(self: &Arc<Self>, monitor: Arc<dyn Monitor>) -> FaultlineResult<()>
    {
        self.ensure_initialized();
        let callbacks = self.callbacks();
        let mut state = self.lock_state();
        state.registry.add(monitor, &callbacks)
    }

    /// Disable and unregister a monitor, matching by id.
    ///
    /// Unknown monitors are a no-op with a diagnostic.
    pub fn remove_monitor(&self, monitor: &Arc<dyn Monitor>)
    {
        self.lock_state().registry.remove(monitor);
    }

    /// Arm every monitor the current environment allows.
    ///
    /// A monitor stays disarmed if a debugger is attached and it is flagged
    /// debugger-unsafe, or if async-safety is currently required and it is
    /// not flagged async-safe. The pre-built identifier pool is regenerated
    /// as part of activation. After the registry lock is released, every
    /// monitor that ended up enabled receives `notify_post_system_enable`.
    ///
    /// Returns true iff at least one monitor is now enabled. "No monitors
    /// active" is a configuration problem for the caller to surface, not an
    /// error here.
    pub fn activate_monitors(&self) -> bool
    {
        self.ensure_initialized();

        let debugger_attached = is_being_traced();
        let async_safety_required = self.policy.async_safety();

        if debugger_attached {
            static DEBUGGER_NOTICE: Once = Once::new();
            DEBUGGER_NOTICE.call_once(|| {
                warn!("    ************************ Crash Handler Notice ************************");
                warn!("    *     App is running in a debugger. Masking out unsafe monitors.     *");
                warn!("    * This means that most crashes WILL NOT BE RECORDED while debugging! *");
                warn!("    **********************************************************************");
            });
        }

        if async_safety_required {
            debug!("Async-safe environment detected. Masking out unsafe monitors.");
        }

        self.lock_state().event_ids.regenerate();

        let mut state = self.lock_state();

        // Regenerated once more under the lock; the call is idempotent.
        state.event_ids.regenerate();

        if state.registry.is_empty() {
            debug!("No monitors are registered.");
        }

        for monitor in state.registry.monitors() {
            let should_enable = should_enable_monitor(monitor.flags(), debugger_attached, async_safety_required);
            monitor.set_enabled(should_enable);
        }

        let mut enabled: SmallVec<[Arc<dyn Monitor>; 8]> = SmallVec::new();
        debug!("Active monitors are now:");
        for monitor in state.registry.monitors() {
            if monitor.is_enabled() {
                debug!("Monitor {} is enabled.", monitor.id());
                enabled.push(Arc::clone(monitor));
            } else {
                debug!("Monitor {} is disabled.", monitor.id());
            }
        }

        drop(state);

        // Monitor callbacks may themselves mutate the registry or log; they
        // must never run while the registry lock is held.
        for monitor in &enabled {
            monitor.notify_post_system_enable();
        }

        !enabled.is_empty()
    }

    /// Disable every registered monitor.
    ///
    /// The unconditional counterpart to [`activate_monitors`]; callable any
    /// time, used for teardown and crash-during-crash shutdown.
    ///
    /// [`activate_monitors`]: MonitorSystem::activate_monitors
    pub fn disable_all_monitors(&self)
    {
        self.lock_state().registry.disable_all();
        debug!("All monitors have been disabled.");
    }

    /// Phase one of the protocol: merge a fault site's recommendation into
    /// the global policy.
    ///
    /// Non-fatal recommendations only OR their async-safety requirement in
    /// and never touch the fatal flag. The first fatal notification arms the
    /// episode; a *second* fatal notification before reset means the crash
    /// handler itself crashed. All monitors are then disabled on the spot,
    /// before any `handle` call, to break the fault loop.
    ///
    /// Returns true iff a crash-during-crash-handling was detected.
    pub fn notify(&self, recommendation: ExceptionHandlingPolicy) -> bool
    {
        self.policy.merge_async_safety(recommendation.async_safety);
        if !recommendation.is_fatal {
            return false;
        }

        if self.policy.record_fatal() {
            self.policy.mark_crashed_during_handling();
        }

        if self.policy.crashed_during_handling() {
            info!("Detected a crash inside the crash handler. Disabling all monitors.");
            self.disable_all_monitors();
            return true;
        }

        false
    }

    /// Phase two of the protocol: capture one crash event.
    ///
    /// Stamps the shared context fields, resolves an event identifier
    /// (generated on demand when async-safety is not required, otherwise
    /// drawn from the pre-built pool), lets every enabled monitor annotate
    /// the context in registration order, then invokes the application
    /// callback outside the lock. When the event is fatal and handling did
    /// not itself crash, all monitors are disabled afterwards so a monitor
    /// whose work is done cannot double-report.
    ///
    /// Never blocks: if the registry lock is held elsewhere the whole call
    /// degrades to a log line, because this thread may be mid-fault. Pool
    /// exhaustion likewise aborts handling instead of looping.
    pub fn handle(&self, context: &mut EventContext)
    {
        context.handling_crash |= self.policy.is_fatal();
        context.requires_async_safety = self.policy.async_safety();
        if self.policy.crashed_during_handling() {
            context.crashed_during_crash_handling = true;
        }

        let mut state = match self.state.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                error!("Unable to acquire the monitor lock. Skipping exception handling.");
                return;
            }
        };

        match Self::resolve_event_id(&self.policy, &mut state.event_ids) {
            Ok(event_id) => context.event_id = Some(event_id),
            Err(err) => {
                error!("{err}. Aborting exception handling.");
                return;
            }
        }

        for monitor in state.registry.monitors() {
            if monitor.is_enabled() {
                monitor.add_contextual_info_to_event(context);
            }
        }

        drop(state);

        let on_event = match self.callback.try_lock() {
            Ok(guard) => (*guard).clone(),
            Err(TryLockError::Poisoned(poisoned)) => (*poisoned.into_inner()).clone(),
            Err(TryLockError::WouldBlock) => {
                error!("Event callback is locked elsewhere. Skipping dispatch.");
                None
            }
        };
        if let Some(on_event) = on_event {
            on_event(context);
        }

        if self.policy.is_fatal() && !self.policy.crashed_during_handling() {
            debug!("Exception is fatal. Disabling all monitors.");
            self.disable_all_monitors();
        }

        context.handling_crash = false;
    }

    /// Refill the pre-built identifier pool.
    pub fn regenerate_event_ids(&self)
    {
        self.lock_state().event_ids.regenerate();
    }

    /// Explicitly clear the sticky async-safety requirement.
    ///
    /// For callers that know the constrained episode is over (e.g. after a
    /// user-triggered report written from a signal-safe path completed).
    pub fn clear_async_safety(&self)
    {
        self.policy.clear_async_safety();
    }

    /// Number of registered monitors.
    #[must_use]
    pub fn monitor_count(&self) -> usize
    {
        self.lock_state().registry.len()
    }

    /// Ids of the registered monitors, in storage order.
    #[must_use]
    pub fn monitor_ids(&self) -> Vec<String>
    {
        self.lock_state()
            .registry
            .monitors()
            .iter()
            .map(|monitor| monitor.id().to_owned())
            .collect()
    }

    /// Return the system to a clean slate: drops all monitors, clears the
    /// policy and callback, regenerates the pool, and requires
    /// re-initialization.
    ///
    /// Test harnesses only. A real fatal episode ends with process
    /// termination, so production code never resets.
    pub fn reset(&self)
    {
        {
            let mut state = self.lock_state();
            state.registry = MonitorRegistry::new();
            state.event_ids.regenerate();
        }
        self.policy.reset();
        *self.lock_callback() = None;
        self.initialized.store(false, Ordering::SeqCst);
    }

    fn ensure_initialized(&self)
    {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        self.lock_state().registry.reserve_initial();
    }

    fn resolve_event_id(policy: &PolicyState, pool: &mut EventIdPool) -> FaultlineResult<EventId>
    {
        if !policy.async_safety() {
            // Ordinary exceptions and user-triggered reports run outside of
            // signal context; generating on demand is safe there.
            return Ok(EventId::generate());
        }

        pool.consume().ok_or(FaultlineError::EventIdsExhausted)
    }

    fn lock_state(&self) -> MutexGuard<'_, SystemState>
    {
        // A writer that panicked while holding the lock must not wedge crash
        // shutdown; take the state as it stands.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_callback(&self) -> MutexGuard<'_, Option<EventCallback>>
    {
        self.callback.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

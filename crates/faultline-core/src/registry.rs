//! # Monitor Registry
//!
//! Ordered collection of registered monitor plugins.
//!
//! The registry is a plain data structure: every entry point that mutates or
//! reads it goes through the owning [`MonitorSystem`], which holds the single
//! lock shared by the registry and the event identifier pool. Keeping the
//! locking out of this type makes the uniqueness and removal semantics
//! directly testable.
//!
//! [`MonitorSystem`]: crate::system::MonitorSystem

use std::sync::Arc;

use tracing::{debug, error};

use crate::error::{FaultlineError, FaultlineResult};
use crate::monitor::Monitor;
use crate::system::ExceptionHandlerCallbacks;

/// Slots reserved on first initialization, before any growth is needed.
pub(crate) const INITIAL_MONITOR_CAPACITY: usize = 15;

/// The set of registered monitors, in registration order.
///
/// Uniqueness is enforced by monitor id. Removal swaps with the last entry
/// and truncates, so registration order is only preserved for monitors that
/// were never preceded by a removal.
#[derive(Default)]
pub(crate) struct MonitorRegistry
{
    monitors: Vec<Arc<dyn Monitor>>,
}

impl MonitorRegistry
{
    pub(crate) fn new() -> Self
    {
        Self { monitors: Vec::new() }
    }

    /// Reserve the initial backing storage. Growth past this point is the
    /// vector's usual geometric doubling.
    pub(crate) fn reserve_initial(&mut self)
    {
        if self.monitors.capacity() == 0 {
            self.monitors.reserve(INITIAL_MONITOR_CAPACITY);
        }
    }

    /// Register a monitor.
    ///
    /// Rejects an empty id and a duplicate id with no state change; on
    /// success invokes `init` exactly once, then appends.
    pub(crate) fn add(&mut self, monitor: Arc<dyn Monitor>, callbacks: &ExceptionHandlerCallbacks)
        -> FaultlineResult<()>
    {
        if monitor.id().is_empty() {
            error!("Attempted to add a monitor with an empty id. Operation aborted.");
            return Err(FaultlineError::EmptyMonitorId);
        }

        if self.monitors.iter().any(|existing| existing.id() == monitor.id()) {
            debug!("Monitor {} already exists. Skipping addition.", monitor.id());
            return Err(FaultlineError::DuplicateMonitor(monitor.id().to_owned()));
        }

        monitor.init(callbacks);
        debug!("Monitor {} injected.", monitor.id());
        self.monitors.push(monitor);
        Ok(())
    }

    /// Disable and remove a monitor, matching by id.
    ///
    /// A monitor that is not registered is a no-op with a diagnostic.
    pub(crate) fn remove(&mut self, monitor: &Arc<dyn Monitor>)
    {
        match self.monitors.iter().position(|existing| existing.id() == monitor.id()) {
            Some(index) => {
                self.monitors[index].set_enabled(false);
                self.monitors.swap_remove(index);
                debug!("Monitor {} removed from the list.", monitor.id());
            }
            None => {
                debug!("Monitor {} not found in the list. No removal performed.", monitor.id());
            }
        }
    }

    /// Disable every registered monitor.
    pub(crate) fn disable_all(&self)
    {
        for monitor in &self.monitors {
            monitor.set_enabled(false);
        }
    }

    pub(crate) fn monitors(&self) -> &[Arc<dyn Monitor>]
    {
        &self.monitors
    }

    pub(crate) fn len(&self) -> usize
    {
        self.monitors.len()
    }

    pub(crate) fn is_empty(&self) -> bool
    {
        self.monitors.is_empty()
    }
}

//! Scenario tests for the two-phase notify/handle exception protocol.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use faultline_core::{
    EventContext, ExceptionHandlerCallbacks, ExceptionHandlingPolicy, Monitor, MonitorFlags, MonitorSystem,
};

/// Monitor that records the order in which annotations run, and optionally
/// re-enters `handle` from inside its own annotation.
struct RecordingMonitor
{
    id: &'static str,
    flags: MonitorFlags,
    enabled: AtomicBool,
    annotation_log: Arc<Mutex<Vec<&'static str>>>,
    callbacks: Mutex<Option<ExceptionHandlerCallbacks>>,
    reenter_handle: bool,
    nested_context_untouched: AtomicBool,
}

impl RecordingMonitor
{
    fn new(id: &'static str, flags: MonitorFlags, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<Self>
    {
        Arc::new(Self {
            id,
            flags,
            enabled: AtomicBool::new(false),
            annotation_log: Arc::clone(log),
            callbacks: Mutex::new(None),
            reenter_handle: false,
            nested_context_untouched: AtomicBool::new(false),
        })
    }

    fn reentrant(id: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<Self>
    {
        Arc::new(Self {
            id,
            flags: MonitorFlags::NONE,
            enabled: AtomicBool::new(false),
            annotation_log: Arc::clone(log),
            callbacks: Mutex::new(None),
            reenter_handle: true,
            nested_context_untouched: AtomicBool::new(false),
        })
    }
}

impl Monitor for RecordingMonitor
{
    fn id(&self) -> &str
    {
        self.id
    }

    fn flags(&self) -> MonitorFlags
    {
        self.flags
    }

    fn init(&self, callbacks: &ExceptionHandlerCallbacks)
    {
        *self.callbacks.lock().unwrap() = Some(callbacks.clone());
    }

    fn set_enabled(&self, enabled: bool)
    {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool
    {
        self.enabled.load(Ordering::SeqCst)
    }

    fn add_contextual_info_to_event(&self, context: &mut EventContext)
    {
        self.annotation_log.lock().unwrap().push(self.id);
        context.signal.number = Some(11);

        if self.reenter_handle {
            // A fault inside annotation re-enters handle on the same thread.
            // The registry lock is held, so the nested call must skip
            // everything and leave the nested context blank.
            let callbacks = self.callbacks.lock().unwrap().clone().unwrap();
            let mut nested = EventContext::new();
            callbacks.handle(&mut nested);
            self.nested_context_untouched
                .store(nested.event_id.is_none() && nested == EventContext::new(), Ordering::SeqCst);
        }
    }
}

fn install_counting_callback(system: &Arc<MonitorSystem>) -> (Arc<AtomicUsize>, Arc<Mutex<Vec<EventContext>>>)
{
    let invocations = Arc::new(AtomicUsize::new(0));
    let captured = Arc::new(Mutex::new(Vec::new()));
    let counter = Arc::clone(&invocations);
    let sink = Arc::clone(&captured);
    system.set_event_callback(Arc::new(move |context: &mut EventContext| {
        counter.fetch_add(1, Ordering::SeqCst);
        sink.lock().unwrap().push(context.clone());
    }));
    (invocations, captured)
}

#[test]
fn test_nonfatal_notify_then_handle()
{
    let system = MonitorSystem::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let monitor = RecordingMonitor::new("signal", MonitorFlags::NONE, &log);
    system.add_monitor(monitor.clone()).unwrap();
    system.activate_monitors();
    let (invocations, captured) = install_counting_callback(&system);

    assert!(!system.notify(ExceptionHandlingPolicy::non_fatal(false)));

    let mut context = EventContext::new();
    system.handle(&mut context);

    assert!(!context.handling_crash);
    assert!(!context.requires_async_safety);
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    let seen = captured.lock().unwrap();
    assert!(seen[0].event_id.is_some());

    // Non-fatal handling must not disarm anything.
    assert!(monitor.is_enabled());
}

#[test]
fn test_fatal_async_handle_annotates_in_registration_order_then_disables()
{
    let system = MonitorSystem::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let alpha = RecordingMonitor::new("alpha", MonitorFlags::ASYNC_SAFE, &log);
    let beta = RecordingMonitor::new("beta", MonitorFlags::ASYNC_SAFE, &log);
    system.add_monitor(alpha.clone()).unwrap();
    system.add_monitor(beta.clone()).unwrap();
    assert!(system.activate_monitors());
    let (invocations, captured) = install_counting_callback(&system);

    assert!(!system.notify(ExceptionHandlingPolicy::fatal(true)));

    let mut context = EventContext::new();
    system.handle(&mut context);

    assert_eq!(*log.lock().unwrap(), vec!["alpha", "beta"]);
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert!(!context.handling_crash, "handling flag must be cleared on the way out");

    let seen = captured.lock().unwrap();
    assert!(seen[0].handling_crash, "the callback observes the in-flight handling flag");
    assert!(seen[0].requires_async_safety);
    assert!(seen[0].event_id.is_some());
    assert!(!seen[0].crashed_during_crash_handling);

    // Fatal handling disarms every monitor once the callback has returned.
    assert!(!alpha.is_enabled());
    assert!(!beta.is_enabled());
}

#[test]
fn test_second_fatal_notify_disables_monitors_before_handling()
{
    let system = MonitorSystem::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let monitor = RecordingMonitor::new("signal", MonitorFlags::ASYNC_SAFE, &log);
    system.add_monitor(monitor.clone()).unwrap();
    assert!(system.activate_monitors());
    let (invocations, captured) = install_counting_callback(&system);

    assert!(!system.notify(ExceptionHandlingPolicy::fatal(true)));
    assert!(system.notify(ExceptionHandlingPolicy::fatal(true)));
    assert!(!monitor.is_enabled(), "the re-entrant fatality must disarm everything immediately");

    let mut context = EventContext::new();
    system.handle(&mut context);

    assert!(context.crashed_during_crash_handling);
    // The monitor was disabled before handling, so no annotation ran.
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert!(captured.lock().unwrap()[0].crashed_during_crash_handling);
}

#[test]
fn test_pool_exhaustion_aborts_handling()
{
    let system = MonitorSystem::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let monitor = RecordingMonitor::new("signal", MonitorFlags::ASYNC_SAFE, &log);
    system.add_monitor(monitor).unwrap();
    assert!(system.activate_monitors());
    let (invocations, captured) = install_counting_callback(&system);

    // Async-safety forces every event id to come from the two-slot pool.
    assert!(!system.notify(ExceptionHandlingPolicy::non_fatal(true)));

    let mut first = EventContext::new();
    let mut second = EventContext::new();
    let mut third = EventContext::new();
    system.handle(&mut first);
    system.handle(&mut second);
    system.handle(&mut third);

    assert!(first.event_id.is_some());
    assert!(second.event_id.is_some());
    assert_ne!(first.event_id, second.event_id);
    assert!(third.event_id.is_none(), "the third draw must abort instead of generating");
    assert_eq!(invocations.load(Ordering::SeqCst), 2);
    assert_eq!(captured.lock().unwrap().len(), 2);
}

#[test]
fn test_regenerate_refills_the_pool()
{
    let system = MonitorSystem::new();
    let (invocations, _captured) = install_counting_callback(&system);
    assert!(!system.notify(ExceptionHandlingPolicy::non_fatal(true)));

    let mut context = EventContext::new();
    system.handle(&mut context);
    system.handle(&mut context);
    system.regenerate_event_ids();
    system.handle(&mut context);

    assert!(context.event_id.is_some());
    assert_eq!(invocations.load(Ordering::SeqCst), 3);
}

#[test]
fn test_reentrant_handle_is_skipped_while_lock_is_held()
{
    let system = MonitorSystem::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let monitor = RecordingMonitor::reentrant("reentrant", &log);
    system.add_monitor(monitor.clone()).unwrap();
    assert!(system.activate_monitors());
    let (invocations, _captured) = install_counting_callback(&system);

    let mut context = EventContext::new();
    system.handle(&mut context);

    assert!(monitor.nested_context_untouched.load(Ordering::SeqCst));
    assert_eq!(*log.lock().unwrap(), vec!["reentrant"], "the nested call must not annotate again");
    assert_eq!(invocations.load(Ordering::SeqCst), 1, "only the outer handle reaches the callback");
    assert!(context.event_id.is_some());
}

#[test]
fn test_clear_async_safety_returns_to_on_demand_ids()
{
    let system = MonitorSystem::new();
    let (invocations, _captured) = install_counting_callback(&system);

    assert!(!system.notify(ExceptionHandlingPolicy::non_fatal(true)));
    let mut context = EventContext::new();
    system.handle(&mut context);
    system.handle(&mut context);
    system.handle(&mut context);
    assert_eq!(invocations.load(Ordering::SeqCst), 2, "pool exhausted");

    // With the requirement cleared, ids are generated on demand again.
    system.clear_async_safety();
    let mut relaxed = EventContext::new();
    system.handle(&mut relaxed);
    assert!(relaxed.event_id.is_some());
    assert!(!relaxed.requires_async_safety);
    assert_eq!(invocations.load(Ordering::SeqCst), 3);
}

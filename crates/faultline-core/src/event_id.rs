//! # Event Identifiers
//!
//! Unique identifiers for crash events, and the fixed pool that pre-builds
//! them outside of fault context.
//!
//! Generating an identifier draws entropy and may allocate, which is not
//! async-signal-safe. The synchronous handling path (ordinary language
//! exceptions, user-triggered reports) generates ids on demand; the
//! async-constrained path (signal and kernel-exception handlers) must instead
//! draw from a pool that was filled ahead of time. The pool holds exactly two
//! slots (a primary id and a secondary "crash during crash" id) because the
//! process is expected to terminate after two escalations; there is never a
//! third.

use std::fmt;

use uuid::Uuid;

/// Unique identifier assigned to a single crash event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(Uuid);

impl EventId
{
    /// Generate a fresh identifier.
    ///
    /// Draws entropy and is therefore only safe from a non-async-constrained
    /// context. Inside a fault handler, consume from [`EventIdPool`] instead.
    #[must_use]
    pub fn generate() -> Self
    {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid
    {
        &self.0
    }
}

impl fmt::Display for EventId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// Number of pre-built identifiers: the crash slot and the recrash slot.
pub const EVENT_ID_POOL_CAPACITY: usize = 2;

/// Fixed-capacity pool of pre-generated event identifiers.
///
/// `regenerate` must run from a non-async-constrained context (activation,
/// reset); `consume` is a plain array read plus a cursor bump and is safe
/// anywhere. Exhaustion is reported to the caller, never retried: if both
/// slots are gone, the process is looping through its own crash handler and
/// handling should abort.
#[derive(Debug)]
pub struct EventIdPool
{
    ids: [EventId; EVENT_ID_POOL_CAPACITY],
    cursor: usize,
}

impl EventIdPool
{
    /// Create a pool with freshly generated identifiers and the cursor at 0.
    #[must_use]
    pub fn new() -> Self
    {
        Self {
            ids: [EventId::generate(), EventId::generate()],
            cursor: 0,
        }
    }

    /// Fill every slot with a fresh identifier and reset the cursor.
    ///
    /// Idempotent: calling it twice in a row is wasteful but harmless.
    pub fn regenerate(&mut self)
    {
        for slot in &mut self.ids {
            *slot = EventId::generate();
        }
        self.cursor = 0;
    }

    /// Take the identifier at the cursor and advance.
    ///
    /// Returns `None` once every slot has been consumed.
    pub fn consume(&mut self) -> Option<EventId>
    {
        if self.cursor >= self.ids.len() {
            return None;
        }

        let id = self.ids[self.cursor];
        self.cursor += 1;
        Some(id)
    }

    /// True once every pre-built identifier has been consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool
    {
        self.cursor >= self.ids.len()
    }
}

impl Default for EventIdPool
{
    fn default() -> Self
    {
        Self::new()
    }
}

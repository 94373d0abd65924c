//! Handler guard state for the protected signals
//!
//! Each protected signal has one registration record holding the handler
//! we installed and a locked flag. Transitions are monotone: a record is
//! created unlocked, locked once by [`HandlerGuard::arm`], and unlocked at
//! most once by [`HandlerGuard::disarm`] when a genuine fault is handed back
//! to the default disposition. That makes plain atomic loads enough for
//! concurrent readers, including signal handlers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use libc::c_int;

/// Signals whose handlers the guard keeps for itself
pub const PROTECTED_SIGNALS: [c_int; 3] = [libc::SIGSEGV, libc::SIGTRAP, libc::SIGILL];

/// What an intercepted registration call should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationVerdict {
    /// Report success without touching the real disposition
    Divert,
    /// Pass the call to the real primitive unchanged
    Delegate,
}

/// Registration record for one protected signal
#[derive(Debug)]
pub struct SignalRecord {
    signal: c_int,
    handler: AtomicUsize,
    locked: AtomicBool,
}

impl SignalRecord {
    const fn new(signal: c_int) -> Self {
        Self {
            signal,
            handler: AtomicUsize::new(0),
            locked: AtomicBool::new(false),
        }
    }

    pub fn signal(&self) -> c_int {
        self.signal
    }

    /// Address of the handler we installed, 0 if none yet
    pub fn handler(&self) -> usize {
        self.handler.load(Ordering::Acquire)
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

/// Process-wide set of registration records
#[derive(Debug)]
pub struct HandlerGuard {
    records: [SignalRecord; PROTECTED_SIGNALS.len()],
}

impl HandlerGuard {
    pub const fn new() -> Self {
        Self {
            records: [
                SignalRecord::new(PROTECTED_SIGNALS[0]),
                SignalRecord::new(PROTECTED_SIGNALS[1]),
                SignalRecord::new(PROTECTED_SIGNALS[2]),
            ],
        }
    }

    /// Record for `signal`, if it is protected
    pub fn record(&self, signal: c_int) -> Option<&SignalRecord> {
        self.records.iter().find(|r| r.signal == signal)
    }

    pub fn is_protected(&self, signal: c_int) -> bool {
        self.record(signal).is_some()
    }

    pub fn is_locked(&self, signal: c_int) -> bool {
        self.record(signal).is_some_and(SignalRecord::is_locked)
    }

    /// Remember the handler installed for `signal`
    ///
    /// Returns false if `signal` is not protected.
    pub fn set_handler(&self, signal: c_int, handler: usize) -> bool {
        match self.record(signal) {
            Some(record) => {
                record.handler.store(handler, Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Lock every protected signal
    pub fn arm(&self) {
        for record in &self.records {
            record.locked.store(true, Ordering::Release);
        }
    }

    /// Unlock `signal`; returns whether it was locked
    ///
    /// Only the state changes here. Restoring the OS default disposition is
    /// the caller's job, since that needs the real registration primitive.
    pub fn disarm(&self, signal: c_int) -> bool {
        self.record(signal)
            .is_some_and(|r| r.locked.swap(false, Ordering::AcqRel))
    }

    /// Decide an intercepted registration
    ///
    /// `installs` is false for pure queries (null new action).
    pub fn decide(&self, signal: c_int, installs: bool) -> RegistrationVerdict {
        if installs && self.is_locked(signal) {
            RegistrationVerdict::Divert
        } else {
            RegistrationVerdict::Delegate
        }
    }
}

impl Default for HandlerGuard {
    fn default() -> Self {
        Self::new()
    }
}

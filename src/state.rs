//! Process-wide layer state
//!
//! One static object holds the cached primitives, the handler guard and the
//! settings the initializer derived from config. Everything in it follows a
//! write-once or lock-once/unlock-once discipline, so signal handlers read
//! it without locking.

use std::ffi::c_int;
use std::sync::OnceLock;

use sigshield_core::{Config, CorrectionPolicy, HandlerGuard, SyscallFilter};

use crate::resolver::RealPrimitives;

static STATE: ShieldState = ShieldState::new();

/// The process's single state object
pub fn state() -> &'static ShieldState {
    &STATE
}

#[derive(Debug)]
pub struct ShieldState {
    pub primitives: RealPrimitives,
    pub guard: HandlerGuard,
    policy: OnceLock<CorrectionPolicy>,
    syscall_filter: OnceLock<SyscallFilter>,
}

impl ShieldState {
    pub const fn new() -> Self {
        Self {
            primitives: RealPrimitives::new(),
            guard: HandlerGuard::new(),
            policy: OnceLock::new(),
            syscall_filter: OnceLock::new(),
        }
    }

    /// Fix the correction policy and syscall filter; first call wins
    pub fn configure(&self, config: &Config) {
        let _ = self.policy.set(config.policy());
        let _ = self.syscall_filter.set(config.syscall_filter());
    }

    /// Active correction policy, defaults until configured
    pub fn policy(&self) -> CorrectionPolicy {
        self.policy.get().copied().unwrap_or_default()
    }

    /// Active syscall filter, defaults until configured
    pub fn syscall_filter(&self) -> SyscallFilter {
        self.syscall_filter.get().copied().unwrap_or_default()
    }

    /// Give `signal` back to the OS default disposition and unlock it
    ///
    /// Async-signal-safe once the primitives are resolved.
    pub fn disarm(&self, signal: c_int) {
        if let Some(real) = self.primitives.sigaction() {
            unsafe {
                let mut action: libc::sigaction = std::mem::zeroed();
                action.sa_sigaction = libc::SIG_DFL;
                libc::sigemptyset(&mut action.sa_mask);
                real(signal, &action, std::ptr::null_mut());
            }
        }
        self.guard.disarm(signal);
    }

    /// Disarm `signal` and deliver it again so the default action runs
    pub fn reraise_default(&self, signal: c_int) {
        self.disarm(signal);
        unsafe {
            libc::raise(signal);
        }
    }
}

impl Default for ShieldState {
    fn default() -> Self {
        Self::new()
    }
}

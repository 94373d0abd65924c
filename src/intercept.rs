//! Interposed `sigaction()` and `signal()`
//!
//! Each entry point is a thin decision over the handler guard: while a
//! protected signal is locked, installation attempts report success and
//! change nothing; queries, unprotected signals and unlocked signals go to
//! the real primitive untouched.
//!
//! Nothing here logs: both entry points may be called from signal handlers.

use std::ffi::c_int;
use std::ptr;

use sigshield_core::{HandlerGuard, RegistrationVerdict};

use crate::resolver::{SigactionFn, SignalFn};
use crate::state::state;
use crate::syscall::set_errno;

/// Decision behind the exported `sigaction`
///
/// A diverted call fills `oldact` with the disposition actually in force,
/// which is ours, so callers that save and later restore "their" handler
/// keep working.
///
/// # Safety
/// Same contract as `sigaction(2)`.
pub unsafe fn intercept_sigaction(
    guard: &HandlerGuard,
    real: Option<SigactionFn>,
    signum: c_int,
    act: *const libc::sigaction,
    oldact: *mut libc::sigaction,
) -> c_int {
    let Some(real) = real else {
        set_errno(libc::ENOSYS);
        return -1;
    };

    match guard.decide(signum, !act.is_null()) {
        RegistrationVerdict::Divert => {
            if !oldact.is_null() {
                real(signum, ptr::null(), oldact);
            }
            0
        }
        RegistrationVerdict::Delegate => real(signum, act, oldact),
    }
}

/// Decision behind the exported `signal`
///
/// # Safety
/// Same contract as `signal(2)`.
pub unsafe fn intercept_signal(
    guard: &HandlerGuard,
    real_signal: Option<SignalFn>,
    real_sigaction: Option<SigactionFn>,
    signum: c_int,
    handler: libc::sighandler_t,
) -> libc::sighandler_t {
    if guard.decide(signum, true) == RegistrationVerdict::Divert {
        return current_handler(guard, real_sigaction, signum);
    }

    if let Some(real) = real_signal {
        return real(signum, handler);
    }

    // No real signal(); emulate glibc's BSD semantics on top of sigaction
    let Some(real) = real_sigaction else {
        set_errno(libc::ENOSYS);
        return libc::SIG_ERR;
    };
    let mut action: libc::sigaction = std::mem::zeroed();
    action.sa_sigaction = handler;
    action.sa_flags = libc::SA_RESTART;
    libc::sigemptyset(&mut action.sa_mask);

    let mut previous: libc::sigaction = std::mem::zeroed();
    if real(signum, &action, &mut previous) != 0 {
        return libc::SIG_ERR;
    }
    previous.sa_sigaction
}

/// Handler currently installed for a protected signal
unsafe fn current_handler(
    guard: &HandlerGuard,
    real_sigaction: Option<SigactionFn>,
    signum: c_int,
) -> libc::sighandler_t {
    if let Some(real) = real_sigaction {
        let mut current: libc::sigaction = std::mem::zeroed();
        if real(signum, ptr::null(), &mut current) == 0 {
            return current.sa_sigaction;
        }
    }
    guard
        .record(signum)
        .map(|r| r.handler())
        .unwrap_or(libc::SIG_DFL)
}

/// Interposed `sigaction(2)`
///
/// # Safety
/// Same contract as `sigaction(2)`.
#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn sigaction(
    signum: c_int,
    act: *const libc::sigaction,
    oldact: *mut libc::sigaction,
) -> c_int {
    let state = state();
    intercept_sigaction(
        &state.guard,
        state.primitives.sigaction(),
        signum,
        act,
        oldact,
    )
}

/// Interposed `signal(2)`
///
/// # Safety
/// Same contract as `signal(2)`.
#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn signal(signum: c_int, handler: libc::sighandler_t) -> libc::sighandler_t {
    let state = state();
    intercept_signal(
        &state.guard,
        state.primitives.signal(),
        state.primitives.sigaction(),
        signum,
        handler,
    )
}

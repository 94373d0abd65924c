//! The installed SIGSEGV and SIGTRAP/SIGILL handlers
//!
//! Both handlers only classify, rewrite registers and, for genuine faults,
//! disarm and re-raise. No logging and no allocation happen here.

use std::ffi::{c_int, c_void};
use std::io;

use sigshield_core::{classify_memory_fault, classify_trap, Correction, HandlerGuard};

use crate::init::InitError;
use crate::machine::{fault_address, ProcessMemory, UcontextRegisters};
use crate::resolver::SigactionFn;
use crate::state::state;

type SigInfoHandler = extern "C" fn(c_int, *mut libc::siginfo_t, *mut c_void);

/// SIGSEGV: null calls and null dereferences
extern "C" fn memory_fault_handler(signal: c_int, info: *mut libc::siginfo_t, ctx: *mut c_void) {
    let state = state();
    if info.is_null() || ctx.is_null() {
        state.reraise_default(signal);
        return;
    }

    unsafe {
        let fault_addr = fault_address(info);
        let mut regs = UcontextRegisters::from_raw(ctx);
        match classify_memory_fault(&regs, fault_addr, &ProcessMemory, &state.policy()) {
            Correction::Resume { recovery, .. } => recovery.apply(&mut regs),
            Correction::Genuine => state.reraise_default(signal),
        }
    }
}

/// SIGTRAP and SIGILL: int3/ud2 abort stubs
extern "C" fn trap_handler(signal: c_int, _info: *mut libc::siginfo_t, ctx: *mut c_void) {
    let state = state();
    if ctx.is_null() {
        state.reraise_default(signal);
        return;
    }

    unsafe {
        let mut regs = UcontextRegisters::from_raw(ctx);
        match classify_trap(&regs, &ProcessMemory, &state.policy()) {
            Correction::Resume { recovery, .. } => recovery.apply(&mut regs),
            Correction::Genuine => state.reraise_default(signal),
        }
    }
}

/// Install both handlers through `real` and record them in `guard`
///
/// Stops at the first failure; the guard must not be armed in that case.
///
/// # Safety
/// `real` must be the process's real `sigaction`.
pub(crate) unsafe fn install_handlers(
    guard: &HandlerGuard,
    real: SigactionFn,
) -> Result<(), InitError> {
    install(guard, real, libc::SIGSEGV, memory_fault_handler)?;
    install(guard, real, libc::SIGTRAP, trap_handler)?;
    install(guard, real, libc::SIGILL, trap_handler)?;
    Ok(())
}

unsafe fn install(
    guard: &HandlerGuard,
    real: SigactionFn,
    signal: c_int,
    handler: SigInfoHandler,
) -> Result<(), InitError> {
    let mut action: libc::sigaction = std::mem::zeroed();
    action.sa_sigaction = handler as usize;
    // NODEFER: a second fault of the same kind inside a resumed path must
    // reach us again instead of being held pending
    action.sa_flags = libc::SA_SIGINFO | libc::SA_NODEFER;
    libc::sigemptyset(&mut action.sa_mask);

    if real(signal, &action, std::ptr::null_mut()) != 0 {
        return Err(InitError::Install {
            signal,
            source: io::Error::last_os_error(),
        });
    }
    guard.set_handler(signal, handler as usize);
    Ok(())
}

//! Interposed `syscall()`
//!
//! The designated number (clone3 by default) fails with ENOSYS without
//! reaching the kernel; every other number is forwarded with all six
//! argument slots and its result and errno are left exactly as the real
//! dispatcher set them.

use std::ffi::{c_int, c_long};

use sigshield_core::{SyscallFilter, SyscallVerdict};

use crate::resolver::SyscallFn;
use crate::state::state;

/// Something that can execute a raw syscall
pub trait SyscallDispatch {
    /// # Safety
    /// Same contract as `syscall(2)` for the given number and arguments.
    unsafe fn dispatch(&self, number: c_long, args: [c_long; 6]) -> c_long;
}

/// libc's variadic `syscall`
#[derive(Debug, Clone, Copy)]
pub struct RealDispatcher {
    syscall: SyscallFn,
}

impl RealDispatcher {
    pub fn new(syscall: SyscallFn) -> Self {
        Self { syscall }
    }
}

impl SyscallDispatch for RealDispatcher {
    unsafe fn dispatch(&self, number: c_long, args: [c_long; 6]) -> c_long {
        let [a1, a2, a3, a4, a5, a6] = args;
        (self.syscall)(number, a1, a2, a3, a4, a5, a6)
    }
}

/// Apply `filter` to one syscall
///
/// # Safety
/// Same contract as `syscall(2)` for forwarded numbers.
pub unsafe fn filter_syscall<D: SyscallDispatch + ?Sized>(
    filter: &SyscallFilter,
    dispatcher: Option<&D>,
    number: c_long,
    args: [c_long; 6],
) -> c_long {
    match filter.verdict(i64::from(number)) {
        SyscallVerdict::Deny { errno } => {
            set_errno(errno);
            -1
        }
        SyscallVerdict::Forward => match dispatcher {
            Some(dispatcher) => dispatcher.dispatch(number, args),
            None => {
                set_errno(libc::ENOSYS);
                -1
            }
        },
    }
}

/// Set the calling thread's `errno`
pub(crate) fn set_errno(value: c_int) {
    unsafe {
        *libc::__errno_location() = value;
    }
}

/// Interposed `syscall(2)`
///
/// Declared with six fixed `long` parameters rather than C varargs. On the
/// SysV x86_64 and AAPCS64 calling conventions integer varargs travel in the
/// same registers as fixed arguments, so variadic callers are served
/// unchanged; slots the caller did not pass hold junk that the kernel
/// ignores for that syscall.
///
/// # Safety
/// Same contract as `syscall(2)`.
#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn syscall(
    number: c_long,
    a1: c_long,
    a2: c_long,
    a3: c_long,
    a4: c_long,
    a5: c_long,
    a6: c_long,
) -> c_long {
    let state = state();
    let real = state.primitives.syscall().map(RealDispatcher::new);
    filter_syscall(
        &state.syscall_filter(),
        real.as_ref(),
        number,
        [a1, a2, a3, a4, a5, a6],
    )
}

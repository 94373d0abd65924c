//! Linux binding of the register-context capability
//!
//! [`ProcessMemory`] works on any architecture. [`UcontextRegisters`] maps
//! the four abstract registers onto x86_64 general registers: RIP, RSP, RBP
//! and RAX.

use std::ffi::c_int;

use sigshield_core::MemoryReader;

// Kernel-generated SIGSEGV codes; only these carry a data address
const SEGV_MAPERR: c_int = 1;
const SEGV_ACCERR: c_int = 2;

/// Data address of a SIGSEGV, if the kernel reported one
///
/// Signals queued by `kill`/`tgkill` overlay `si_addr` with the sender's
/// pid and uid, and general-protection faults report 0. Neither is a fault
/// address.
///
/// # Safety
/// `info` must point to the `siginfo_t` handed to an `SA_SIGINFO` handler.
pub unsafe fn fault_address(info: *const libc::siginfo_t) -> Option<usize> {
    match (*info).si_code {
        SEGV_MAPERR | SEGV_ACCERR => Some((*info).si_addr() as usize),
        _ => None,
    }
}

/// Reads through raw pointers in the current address space
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessMemory;

impl MemoryReader for ProcessMemory {
    unsafe fn read_word(&self, addr: usize) -> usize {
        (addr as *const usize).read_unaligned()
    }

    unsafe fn read_byte(&self, addr: usize) -> u8 {
        (addr as *const u8).read_volatile()
    }
}

#[cfg(target_arch = "x86_64")]
pub use self::x86_64::UcontextRegisters;

#[cfg(target_arch = "x86_64")]
mod x86_64 {
    use std::ffi::{c_int, c_void};

    use sigshield_core::RegisterContext;

    /// General registers of an interrupted thread, as saved by the kernel
    pub struct UcontextRegisters<'a> {
        gregs: &'a mut [libc::greg_t; 23],
    }

    impl<'a> UcontextRegisters<'a> {
        /// # Safety
        /// `ctx` must be the `ucontext_t` handed to an `SA_SIGINFO` handler,
        /// and must outlive the returned value.
        pub unsafe fn from_raw(ctx: *mut c_void) -> Self {
            let uc = &mut *(ctx as *mut libc::ucontext_t);
            Self {
                gregs: &mut uc.uc_mcontext.gregs,
            }
        }

        pub fn from_ucontext(uc: &'a mut libc::ucontext_t) -> Self {
            Self {
                gregs: &mut uc.uc_mcontext.gregs,
            }
        }

        fn get(&self, reg: c_int) -> usize {
            self.gregs[reg as usize] as usize
        }

        fn set(&mut self, reg: c_int, value: usize) {
            self.gregs[reg as usize] = value as libc::greg_t;
        }
    }

    impl RegisterContext for UcontextRegisters<'_> {
        fn instruction_pointer(&self) -> usize {
            self.get(libc::REG_RIP)
        }
        fn stack_pointer(&self) -> usize {
            self.get(libc::REG_RSP)
        }
        fn frame_pointer(&self) -> usize {
            self.get(libc::REG_RBP)
        }
        fn return_value(&self) -> usize {
            self.get(libc::REG_RAX)
        }
        fn set_instruction_pointer(&mut self, value: usize) {
            self.set(libc::REG_RIP, value);
        }
        fn set_stack_pointer(&mut self, value: usize) {
            self.set(libc::REG_RSP, value);
        }
        fn set_frame_pointer(&mut self, value: usize) {
            self.set(libc::REG_RBP, value);
        }
        fn set_return_value(&mut self, value: usize) {
            self.set(libc::REG_RAX, value);
        }
    }
}

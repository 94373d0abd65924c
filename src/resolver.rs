//! Lazily resolved libc primitives underneath our interposed symbols
//!
//! Because this library exports `sigaction`, `signal` and `syscall`, a plain
//! call to any of them from inside the library would land back in our own
//! wrappers. The real ones are looked up with `dlsym(RTLD_NEXT, ...)` and
//! cached. Each slot goes from null to resolved once; concurrent first
//! lookups race harmlessly because they all find the same address.

use std::ffi::{c_int, c_long, c_void, CStr};
use std::sync::atomic::{AtomicPtr, Ordering};

pub type SigactionFn =
    unsafe extern "C" fn(c_int, *const libc::sigaction, *mut libc::sigaction) -> c_int;
pub type SignalFn = unsafe extern "C" fn(c_int, libc::sighandler_t) -> libc::sighandler_t;
pub type SyscallFn = unsafe extern "C" fn(c_long, ...) -> c_long;

/// One cached symbol
#[derive(Debug)]
struct Slot {
    name: &'static CStr,
    addr: AtomicPtr<c_void>,
}

impl Slot {
    const fn new(name: &'static CStr) -> Self {
        Self {
            name,
            addr: AtomicPtr::new(std::ptr::null_mut()),
        }
    }

    fn resolve(&self) -> Option<*mut c_void> {
        let cached = self.addr.load(Ordering::Acquire);
        if !cached.is_null() {
            return Some(cached);
        }

        let found = unsafe { libc::dlsym(libc::RTLD_NEXT, self.name.as_ptr()) };
        if found.is_null() {
            return None;
        }
        self.addr.store(found, Ordering::Release);
        Some(found)
    }
}

/// The non-intercepted registration and syscall primitives
#[derive(Debug)]
pub struct RealPrimitives {
    sigaction: Slot,
    signal: Slot,
    syscall: Slot,
}

impl RealPrimitives {
    pub const fn new() -> Self {
        Self {
            sigaction: Slot::new(c"sigaction"),
            signal: Slot::new(c"signal"),
            syscall: Slot::new(c"syscall"),
        }
    }

    /// Real `sigaction`, `None` if it cannot be found
    pub fn sigaction(&self) -> Option<SigactionFn> {
        self.sigaction
            .resolve()
            .map(|p| unsafe { std::mem::transmute::<*mut c_void, SigactionFn>(p) })
    }

    /// Real `signal`
    pub fn signal(&self) -> Option<SignalFn> {
        self.signal
            .resolve()
            .map(|p| unsafe { std::mem::transmute::<*mut c_void, SignalFn>(p) })
    }

    /// Real variadic `syscall`
    pub fn syscall(&self) -> Option<SyscallFn> {
        self.syscall
            .resolve()
            .map(|p| unsafe { std::mem::transmute::<*mut c_void, SyscallFn>(p) })
    }

    /// Resolve every slot now; returns false if any is missing
    ///
    /// Signal handlers must not end up calling `dlsym`, so the initializer
    /// warms the cache before installing them.
    pub fn resolve_all(&self) -> bool {
        let sigaction = self.sigaction.resolve().is_some();
        let signal = self.signal.resolve().is_some();
        let syscall = self.syscall.resolve().is_some();
        sigaction && signal && syscall
    }
}

impl Default for RealPrimitives {
    fn default() -> Self {
        Self::new()
    }
}

//! sigshield: preloadable fault-correction layer
//!
//! Loaded with `LD_PRELOAD`, this library:
//! - installs SIGSEGV/SIGTRAP/SIGILL handlers before the host's own startup
//! - refuses later attempts to replace them through `sigaction()`/`signal()`
//! - resumes execution after null calls, null dereferences and abort stubs
//! - fails `syscall(SYS_clone3, ...)` with ENOSYS
//!
//! Faults the correctors do not recognise are handed back to the default
//! disposition and re-raised, so genuine crashes still crash.

#![cfg(target_os = "linux")]

pub mod init;
pub mod intercept;
pub mod machine;
pub mod resolver;
pub mod state;
pub mod syscall;

#[cfg(target_arch = "x86_64")]
mod handlers;

pub use init::{initialize, InitError};
pub use resolver::RealPrimitives;
pub use state::{state, ShieldState};

//! sigshield-core: Fault classification and correction logic
//!
//! This crate holds everything that can be reasoned about without a live
//! signal frame:
//! - Register-context and memory capabilities the correctors work against
//! - The memory-fault classifier (null calls, null dereferences)
//! - The trap corrector for deliberate abort stubs
//! - Handler guard state for the protected signals
//! - The syscall filter decision
//! - Configuration loading

pub mod classify;
pub mod config;
pub mod context;
pub mod isa;
pub mod recovery;
pub mod trap;

#[cfg(unix)]
pub mod guard;
#[cfg(unix)]
pub mod syscall;

pub use classify::classify_memory_fault;
pub use config::{load_config, load_config_from, Config, ConfigError};
pub use context::{MemoryReader, RegisterContext};
pub use recovery::{Correction, CorrectionPolicy, FaultKind, Recovery};
pub use trap::classify_trap;

#[cfg(unix)]
pub use guard::{HandlerGuard, RegistrationVerdict, PROTECTED_SIGNALS};
#[cfg(unix)]
pub use syscall::{SyscallFilter, SyscallVerdict, SYS_CLONE3};

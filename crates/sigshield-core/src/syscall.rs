//! Syscall filter decision
//!
//! Exactly one syscall number is refused with ENOSYS so the caller takes
//! its documented fallback. The default is `clone3`: glibc falls back to
//! `clone` when `clone3` reports ENOSYS, which sandboxes that predate
//! `clone3` still allow.

/// `clone3` on x86_64 and aarch64
pub const SYS_CLONE3: i64 = 435;

/// What the filter does with one syscall
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallVerdict {
    /// Fail with `errno` without calling the real dispatcher
    Deny { errno: i32 },
    /// Call the real dispatcher with the original arguments
    Forward,
}

/// Refuses one designated syscall number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallFilter {
    designated: Option<i64>,
}

impl SyscallFilter {
    pub const fn new(designated: i64) -> Self {
        Self {
            designated: Some(designated),
        }
    }

    /// A filter that forwards everything
    pub const fn disabled() -> Self {
        Self { designated: None }
    }

    pub fn designated(&self) -> Option<i64> {
        self.designated
    }

    pub fn verdict(&self, number: i64) -> SyscallVerdict {
        if self.designated == Some(number) {
            SyscallVerdict::Deny {
                errno: libc::ENOSYS,
            }
        } else {
            SyscallVerdict::Forward
        }
    }
}

impl Default for SyscallFilter {
    fn default() -> Self {
        Self::new(SYS_CLONE3)
    }
}

//! Correction outcomes shared by the fault and trap correctors

use crate::context::RegisterContext;

/// The recoverable fault shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Control reached a null or near-null function address
    NullCall,
    /// A load or store went through a null or near-null pointer
    NullDeref,
    /// An `int3`/`ud2` assertion stub fired
    AbortStub,
}

/// Register values to install before returning from the handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recovery {
    pub instruction_pointer: usize,
    pub stack_pointer: usize,
    /// `None` leaves the frame pointer as it was at the fault
    pub frame_pointer: Option<usize>,
    pub return_value: usize,
}

impl Recovery {
    /// Write this recovery into a fault context
    pub fn apply<C: RegisterContext + ?Sized>(&self, ctx: &mut C) {
        ctx.set_return_value(self.return_value);
        if let Some(fp) = self.frame_pointer {
            ctx.set_frame_pointer(fp);
        }
        ctx.set_instruction_pointer(self.instruction_pointer);
        ctx.set_stack_pointer(self.stack_pointer);
    }
}

/// Verdict of a corrector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// Rewrite the context and resume
    Resume { kind: FaultKind, recovery: Recovery },
    /// Not one of the recoverable shapes; let the process die
    Genuine,
}

/// Which fault shapes may be corrected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrectionPolicy {
    pub null_calls: bool,
    pub null_derefs: bool,
    pub abort_stubs: bool,
}

impl CorrectionPolicy {
    /// Every shape enabled
    pub const ALL: Self = Self {
        null_calls: true,
        null_derefs: true,
        abort_stubs: true,
    };
}

impl Default for CorrectionPolicy {
    fn default() -> Self {
        Self::ALL
    }
}

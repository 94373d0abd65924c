//! Trap corrector for deliberate abort stubs
//!
//! Assertion macros compile to a tiny out-of-line stub:
//!
//! ```text
//! push rbp
//! mov  rbp, rsp
//! int3
//! ud2
//! ```
//!
//! By the time SIGTRAP/SIGILL arrives the stub has pushed its own frame.
//! Returning into the stub's caller tends to hit the same assertion again,
//! so the correction skips two frames and lands in the caller's caller.
//! When the caller's frame pointer is unusable only the stub frame is
//! unwound.

use crate::classify::unwind_frame;
use crate::context::{MemoryReader, RegisterContext};
use crate::isa;
use crate::recovery::{Correction, CorrectionPolicy, FaultKind};

/// Classify a SIGTRAP/SIGILL and compute its recovery
///
/// # Safety
/// `memory` is read at the faulting instruction pointer and along the frame
/// chain starting at the faulting frame pointer.
pub unsafe fn classify_trap<C, M>(ctx: &C, memory: &M, policy: &CorrectionPolicy) -> Correction
where
    C: RegisterContext + ?Sized,
    M: MemoryReader + ?Sized,
{
    if !policy.abort_stubs {
        return Correction::Genuine;
    }

    if isa::abort_encoding_at(memory, ctx.instruction_pointer()).is_none() {
        return Correction::Genuine;
    }

    let stub_fp = ctx.frame_pointer();
    if !isa::is_plausible_frame(stub_fp) {
        return Correction::Genuine;
    }

    let caller_fp = memory.read_word(stub_fp);
    let recovery = if isa::is_plausible_frame(caller_fp) {
        unwind_frame(caller_fp, memory)
    } else {
        unwind_frame(stub_fp, memory)
    };

    Correction::Resume {
        kind: FaultKind::AbortStub,
        recovery,
    }
}

//! Memory-fault classifier
//!
//! Decides whether a SIGSEGV is one of the two recoverable shapes and, if
//! so, how to make the faulting function look like it returned 0:
//!
//! 1. Null call: the instruction pointer itself is in the low region. The
//!    `call` already pushed a return address at the stack pointer, so pop
//!    it and resume there.
//! 2. Null dereference: the data address is in the low region. Unwind the
//!    faulting function's frame through the frame-pointer chain, or pop a
//!    return address directly when the frame pointer is not usable.
//!
//! Anything else is genuine, including faults that carry no data address
//! at all (signals sent by another process, general-protection faults).

use crate::context::{MemoryReader, RegisterContext};
use crate::isa::{self, FRAME_RECORD_SIZE, WORD_SIZE};
use crate::recovery::{Correction, CorrectionPolicy, FaultKind, Recovery};

/// Classify a memory fault and compute its recovery
///
/// `fault_addr` is `None` when the kernel did not report a data address;
/// such a fault can still be a null call but never a null dereference.
///
/// # Safety
/// `memory` is read at the faulting stack pointer and, when plausible, at
/// the faulting frame pointer. Both must belong to the faulting thread.
pub unsafe fn classify_memory_fault<C, M>(
    ctx: &C,
    fault_addr: Option<usize>,
    memory: &M,
    policy: &CorrectionPolicy,
) -> Correction
where
    C: RegisterContext + ?Sized,
    M: MemoryReader + ?Sized,
{
    let ip = ctx.instruction_pointer();
    let sp = ctx.stack_pointer();

    if isa::is_low_address(ip) {
        if !policy.null_calls {
            return Correction::Genuine;
        }
        return Correction::Resume {
            kind: FaultKind::NullCall,
            recovery: pop_return_address(sp, memory),
        };
    }

    if fault_addr.is_some_and(isa::is_low_address) {
        if !policy.null_derefs {
            return Correction::Genuine;
        }
        let fp = ctx.frame_pointer();
        let recovery = if isa::is_plausible_frame(fp) {
            unwind_frame(fp, memory)
        } else {
            // Frame pointer omitted; assume nothing was pushed yet
            pop_return_address(sp, memory)
        };
        return Correction::Resume {
            kind: FaultKind::NullDeref,
            recovery,
        };
    }

    Correction::Genuine
}

/// Return to the address on top of the stack
pub(crate) unsafe fn pop_return_address<M: MemoryReader + ?Sized>(
    sp: usize,
    memory: &M,
) -> Recovery {
    Recovery {
        instruction_pointer: memory.read_word(sp),
        stack_pointer: sp.wrapping_add(WORD_SIZE),
        frame_pointer: None,
        return_value: 0,
    }
}

/// Return from the function owning frame record `fp`
pub(crate) unsafe fn unwind_frame<M: MemoryReader + ?Sized>(fp: usize, memory: &M) -> Recovery {
    Recovery {
        instruction_pointer: memory.read_word(fp.wrapping_add(WORD_SIZE)),
        stack_pointer: fp.wrapping_add(FRAME_RECORD_SIZE),
        frame_pointer: Some(memory.read_word(fp)),
        return_value: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::synthetic::{SyntheticContext, SyntheticMemory};

    const STACK: usize = 0x7ffd_0000_1000;

    fn classify(ctx: &SyntheticContext, fault_addr: usize, mem: &SyntheticMemory) -> Correction {
        unsafe { classify_memory_fault(ctx, Some(fault_addr), mem, &CorrectionPolicy::ALL) }
    }

    #[test]
    fn test_null_call_returns_to_caller() {
        let ret_addr = 0x5555_0000_1234;
        let mut ctx = SyntheticContext {
            ip: 0,
            sp: STACK,
            fp: STACK + 0x40,
            ret: 0xdead,
        };
        let mem = SyntheticMemory::new().with_word(STACK, ret_addr);

        let correction = classify(&ctx, 0, &mem);
        let Correction::Resume { kind, recovery } = correction else {
            panic!("expected recovery, got {:?}", correction);
        };
        assert_eq!(kind, FaultKind::NullCall);

        recovery.apply(&mut ctx);
        assert_eq!(ctx.ip, ret_addr);
        assert_eq!(ctx.sp, STACK + 8);
        assert_eq!(ctx.ret, 0);
        // Frame pointer untouched: the callee never ran its prologue
        assert_eq!(ctx.fp, STACK + 0x40);
    }

    #[test]
    fn test_null_call_near_null_target() {
        // A call through a null vtable slot lands at a small offset
        let ctx = SyntheticContext {
            ip: 0x18,
            sp: STACK,
            fp: 0,
            ret: 1,
        };
        let mem = SyntheticMemory::new().with_word(STACK, 0x4000_0000);
        assert!(matches!(
            classify(&ctx, 0x18, &mem),
            Correction::Resume {
                kind: FaultKind::NullCall,
                ..
            }
        ));
    }

    #[test]
    fn test_null_deref_unwinds_frame_chain() {
        let fp = STACK + 0x100;
        let saved_fp = STACK + 0x200;
        let return_addr = 0x5555_0000_abcd;
        let mut ctx = SyntheticContext {
            ip: 0x5555_0000_9000,
            sp: STACK,
            fp,
            ret: 7,
        };
        let mem = SyntheticMemory::new()
            .with_word(fp, saved_fp)
            .with_word(fp + 8, return_addr);

        let Correction::Resume { kind, recovery } = classify(&ctx, 0, &mem) else {
            panic!("expected recovery");
        };
        assert_eq!(kind, FaultKind::NullDeref);

        recovery.apply(&mut ctx);
        assert_eq!(ctx.fp, saved_fp);
        assert_eq!(ctx.ip, return_addr);
        assert_eq!(ctx.sp, fp + 16);
        assert_eq!(ctx.ret, 0);
    }

    #[test]
    fn test_null_deref_without_frame_pointer_pops_stack() {
        let return_addr = 0x5555_0000_0042;
        let mut ctx = SyntheticContext {
            ip: 0x5555_0000_9000,
            sp: STACK,
            fp: 0x10,
            ret: 7,
        };
        let mem = SyntheticMemory::new().with_word(STACK, return_addr);

        let Correction::Resume { recovery, .. } = classify(&ctx, 0x8, &mem) else {
            panic!("expected recovery");
        };
        recovery.apply(&mut ctx);
        assert_eq!(ctx.ip, return_addr);
        assert_eq!(ctx.sp, STACK + 8);
        assert_eq!(ctx.fp, 0x10);
        assert_eq!(ctx.ret, 0);
    }

    #[test]
    fn test_frame_pointer_at_threshold_is_not_followed() {
        let ctx = SyntheticContext {
            ip: 0x5555_0000_9000,
            sp: STACK,
            fp: isa::LOW_ADDRESS_THRESHOLD,
            ret: 0,
        };
        // Only the stack word is mapped; following fp would panic
        let mem = SyntheticMemory::new().with_word(STACK, 0x5555_0000_0001);
        assert!(matches!(
            classify(&ctx, 0, &mem),
            Correction::Resume { .. }
        ));
    }

    #[test]
    fn test_high_fault_is_genuine() {
        let ctx = SyntheticContext {
            ip: 0x5555_0000_9000,
            sp: STACK,
            fp: STACK + 0x100,
            ret: 0,
        };
        let mem = SyntheticMemory::new();
        assert_eq!(classify(&ctx, 0x7f00_dead_b000, &mem), Correction::Genuine);
        assert_eq!(
            classify(&ctx, isa::LOW_ADDRESS_THRESHOLD, &mem),
            Correction::Genuine
        );
    }

    #[test]
    fn test_disabled_shapes_are_genuine() {
        let mem = SyntheticMemory::new().with_word(STACK, 0x5555_0000_0001);
        let policy = CorrectionPolicy {
            null_calls: false,
            null_derefs: false,
            abort_stubs: true,
        };

        let null_call = SyntheticContext {
            ip: 0,
            sp: STACK,
            fp: 0,
            ret: 0,
        };
        let null_deref = SyntheticContext {
            ip: 0x5555_0000_9000,
            ..null_call
        };

        unsafe {
            assert_eq!(
                classify_memory_fault(&null_call, Some(0), &mem, &policy),
                Correction::Genuine
            );
            assert_eq!(
                classify_memory_fault(&null_deref, Some(0), &mem, &policy),
                Correction::Genuine
            );
        }
    }

    #[test]
    fn test_missing_fault_address_is_not_a_null_deref() {
        let ctx = SyntheticContext {
            ip: 0x5555_0000_9000,
            sp: STACK,
            fp: STACK + 0x100,
            ret: 0,
        };
        // Nothing mapped: any unwind attempt would panic
        let mem = SyntheticMemory::new();
        let correction = unsafe { classify_memory_fault(&ctx, None, &mem, &CorrectionPolicy::ALL) };
        assert_eq!(correction, Correction::Genuine);
    }

    #[test]
    fn test_null_call_without_fault_address() {
        let ctx = SyntheticContext {
            ip: 0,
            sp: STACK,
            fp: 0,
            ret: 0,
        };
        let mem = SyntheticMemory::new().with_word(STACK, 0x5555_0000_0001);
        let correction = unsafe { classify_memory_fault(&ctx, None, &mem, &CorrectionPolicy::ALL) };
        assert!(matches!(
            correction,
            Correction::Resume {
                kind: FaultKind::NullCall,
                ..
            }
        ));
    }

    #[test]
    fn test_unwind_near_address_space_end_does_not_overflow() {
        let fp = usize::MAX - 7;
        let mem = SyntheticMemory::new()
            .with_word(fp, 0x7ffd_0000_2000)
            .with_word(fp.wrapping_add(8), 0x5555_0000_0001);
        let recovery = unsafe { unwind_frame(fp, &mem) };
        assert_eq!(recovery.stack_pointer, fp.wrapping_add(16));

        let sp = usize::MAX - 7;
        let mem = SyntheticMemory::new().with_word(sp, 0x5555_0000_0001);
        let recovery = unsafe { pop_return_address(sp, &mem) };
        assert_eq!(recovery.stack_pointer, 0);
    }
}

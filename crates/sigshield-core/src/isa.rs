//! Instruction-set assumptions for x86_64 with frame pointers
//!
//! The low-address threshold and the abort encodings below are tied to
//! x86_64 and to how GCC/Clang emit assertion stubs. Another architecture
//! needs its own values; the heuristic is not assumed to carry over.

use crate::context::MemoryReader;

/// No valid code or data mapping starts below this address
///
/// Linux refuses to map anything under `vm.mmap_min_addr` (64 KiB by
/// default), so an instruction pointer or data address below it came from a
/// null or near-null pointer.
pub const LOW_ADDRESS_THRESHOLD: usize = 0x10000;

/// Width of a saved frame pointer or return address
pub const WORD_SIZE: usize = 8;

/// Bytes a `push rbp; mov rbp, rsp` prologue leaves above the frame pointer
pub const FRAME_RECORD_SIZE: usize = 2 * WORD_SIZE;

/// `int3`
pub const INT3: u8 = 0xCC;

/// `ud2`
pub const UD2: [u8; 2] = [0x0F, 0x0B];

/// Which deliberate-abort instruction was found at the faulting location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortEncoding {
    Int3,
    Ud2,
}

/// True if `addr` falls in the never-mapped low region
pub fn is_low_address(addr: usize) -> bool {
    addr < LOW_ADDRESS_THRESHOLD
}

/// Frame-chain plausibility check
///
/// A frame pointer is only followed when it lies above the threshold. This
/// is a heuristic: code built with `-fomit-frame-pointer` may hold any
/// value in the frame-pointer register, and only the low region is ruled
/// out.
pub fn is_plausible_frame(fp: usize) -> bool {
    fp > LOW_ADDRESS_THRESHOLD
}

/// Match the bytes at `ip` against the known abort-stub encodings
///
/// # Safety
/// `ip` must be readable; it is the faulting thread's instruction pointer.
pub unsafe fn abort_encoding_at<M: MemoryReader + ?Sized>(
    memory: &M,
    ip: usize,
) -> Option<AbortEncoding> {
    let first = memory.read_byte(ip);
    if first == INT3 {
        return Some(AbortEncoding::Int3);
    }
    // Only look at the second byte once the first rules in ud2
    if first == UD2[0] && memory.read_byte(ip.wrapping_add(1)) == UD2[1] {
        return Some(AbortEncoding::Ud2);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::synthetic::SyntheticMemory;

    #[test]
    fn test_threshold_edges() {
        assert!(is_low_address(0));
        assert!(is_low_address(LOW_ADDRESS_THRESHOLD - 1));
        assert!(!is_low_address(LOW_ADDRESS_THRESHOLD));

        assert!(!is_plausible_frame(LOW_ADDRESS_THRESHOLD));
        assert!(is_plausible_frame(LOW_ADDRESS_THRESHOLD + 1));
    }

    #[test]
    fn test_abort_encodings() {
        let mem = SyntheticMemory::new()
            .with_bytes(0x1000, &[0xCC])
            .with_bytes(0x2000, &[0x0F, 0x0B])
            .with_bytes(0x3000, &[0x0F, 0x05])
            .with_bytes(0x4000, &[0x90]);

        unsafe {
            assert_eq!(abort_encoding_at(&mem, 0x1000), Some(AbortEncoding::Int3));
            assert_eq!(abort_encoding_at(&mem, 0x2000), Some(AbortEncoding::Ud2));
            // syscall, not ud2
            assert_eq!(abort_encoding_at(&mem, 0x3000), None);
            // second byte is never read for a non-0x0F opcode
            assert_eq!(abort_encoding_at(&mem, 0x4000), None);
        }
    }

    #[test]
    fn test_ud2_straddling_address_space_end() {
        let mem = SyntheticMemory::new()
            .with_bytes(usize::MAX, &[0x0F])
            .with_bytes(0, &[0x0B]);
        unsafe {
            assert_eq!(abort_encoding_at(&mem, usize::MAX), Some(AbortEncoding::Ud2));
        }
    }
}

//! Register-context capability used by the correctors
//!
//! Classification never touches a `ucontext_t` directly. It reads and
//! rewrites registers through [`RegisterContext`] and dereferences the
//! faulting thread's stack through [`MemoryReader`], so only those two
//! implementations vary per CPU architecture.

/// Access to the registers a correction reads or rewrites
pub trait RegisterContext {
    fn instruction_pointer(&self) -> usize;
    fn stack_pointer(&self) -> usize;
    fn frame_pointer(&self) -> usize;
    /// The register a caller reads a function's integer result from
    fn return_value(&self) -> usize;

    fn set_instruction_pointer(&mut self, value: usize);
    fn set_stack_pointer(&mut self, value: usize);
    fn set_frame_pointer(&mut self, value: usize);
    fn set_return_value(&mut self, value: usize);
}

/// Raw reads from the faulting thread's address space
pub trait MemoryReader {
    /// Read one pointer-sized word at `addr`
    ///
    /// # Safety
    /// `addr` must be readable. The classifiers only pass stack addresses
    /// that passed the plausibility check, or the faulting stack pointer.
    unsafe fn read_word(&self, addr: usize) -> usize;

    /// Read one byte at `addr`
    ///
    /// # Safety
    /// `addr` must be readable.
    unsafe fn read_byte(&self, addr: usize) -> u8;
}

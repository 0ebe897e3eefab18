// Copyright 2025 Google LLC.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

//! Access to blocks of 32-bit device registers.

/// A block of 32-bit registers, addressed by byte offset from the start of the block.
///
/// Every call must reach the device: implementations may not cache, merge or reorder accesses.
/// Reads can have side effects (such as popping a FIFO or claiming an interrupt).
pub trait RegisterBlock {
    /// Reads the register at the given byte offset.
    fn read(&self, offset: usize) -> u32;

    /// Writes the register at the given byte offset.
    fn write(&self, offset: usize, value: u32);
}

/// A block of memory-mapped registers.
#[derive(Debug)]
pub struct Mmio {
    base_address: *mut u32,
}

impl Mmio {
    /// Constructs a register block for device registers at the given base address.
    ///
    /// # Safety
    ///
    /// The given base address must point to the MMIO registers of the device, covering every
    /// offset the driver using this block will access. They must be mapped into the address space
    /// of the process as device memory and not have any other aliases.
    pub const unsafe fn new(base_address: *mut u32) -> Self {
        Self { base_address }
    }
}

impl RegisterBlock for Mmio {
    fn read(&self, offset: usize) -> u32 {
        // SAFETY: We were promised when `new` was called that the base address points to the
        // registers of the device, which are appropriately mapped and not aliased.
        unsafe { self.base_address.byte_add(offset).read_volatile() }
    }

    fn write(&self, offset: usize, value: u32) {
        // SAFETY: We were promised when `new` was called that the base address points to the
        // registers of the device, which are appropriately mapped and not aliased.
        unsafe {
            self.base_address.byte_add(offset).write_volatile(value);
        }
    }
}

// SAFETY: `Mmio` just contains a pointer to device memory, which can be accessed from any context.
unsafe impl Send for Mmio {}

// SAFETY: Every access is a single volatile load or store of device memory, so concurrent shared
// access can't cause a data race in the Rust sense.
unsafe impl Sync for Mmio {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accesses_registers_by_byte_offset() {
        let mut registers = [0u32; 4];
        // SAFETY: `registers` outlives the block and isn't accessed other than through it.
        let block = unsafe { Mmio::new(registers.as_mut_ptr()) };

        block.write(0x8, 0x1234_5678);
        block.write(0x0, 7);

        assert_eq!(block.read(0x8), 0x1234_5678);
        assert_eq!(block.read(0x0), 7);
        assert_eq!(block.read(0x4), 0);
        assert_eq!(registers, [7, 0, 0x1234_5678, 0]);
    }
}

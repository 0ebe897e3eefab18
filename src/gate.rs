// Copyright 2025 Google LLC.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

//! Masking interrupts on the current core.

use crate::interrupts::Irq;

/// Masks all interrupts on the current core for the duration of a closure.
///
/// Used to make read-modify-write sequences on registers shared with interrupt handlers atomic.
pub trait InterruptGate {
    /// Runs `f` with interrupts masked, then restores the previous mask state.
    ///
    /// Must be safe to nest, and to call from an interrupt handler.
    fn without_interrupts<T>(&self, f: impl FnOnce() -> T) -> T;
}

/// The core's own interrupt lines, below the interrupt controller.
pub trait CoreLines {
    /// Unmasks the given core interrupt line.
    fn unmask(&self, irq: Irq);
}

/// An [`InterruptGate`] backed by whatever `critical-section` implementation the final binary
/// provides.
#[derive(Clone, Copy, Debug, Default)]
pub struct CriticalSectionGate;

impl InterruptGate for CriticalSectionGate {
    fn without_interrupts<T>(&self, f: impl FnOnce() -> T) -> T {
        critical_section::with(|_| f())
    }
}

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
pub use machine::{MachineGate, MachineLines};

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
mod machine {
    use super::{CoreLines, InterruptGate};
    use crate::interrupts::Irq;
    use core::arch::asm;
    use log::warn;

    /// Machine interrupt enable bit in `mstatus`.
    const MSTATUS_MIE: usize = 1 << 3;

    /// Gates interrupts with the `mstatus.MIE` bit of the current hart.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct MachineGate;

    impl InterruptGate for MachineGate {
        fn without_interrupts<T>(&self, f: impl FnOnce() -> T) -> T {
            let mstatus: usize;
            // SAFETY: Clearing `mstatus.MIE` only masks interrupts, and doesn't touch memory.
            unsafe {
                asm!("csrrci {mstatus}, mstatus, 8", mstatus = out(reg) mstatus, options(nostack));
            }
            let result = f();
            if mstatus & MSTATUS_MIE != 0 {
                // SAFETY: Interrupts were enabled on entry, so this just restores that state.
                unsafe {
                    asm!("csrsi mstatus, 8", options(nostack));
                }
            }
            result
        }
    }

    /// Unmasks core interrupt lines with the `mie` register of the current hart.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct MachineLines;

    impl MachineLines {
        fn bit(irq: Irq) -> Option<usize> {
            if irq.0 < usize::BITS {
                Some(1 << irq.0)
            } else {
                warn!("{irq} is not a core interrupt line");
                None
            }
        }
    }

    impl CoreLines for MachineLines {
        fn unmask(&self, irq: Irq) {
            if let Some(bit) = Self::bit(irq) {
                // SAFETY: Setting a bit of `mie` only unmasks an interrupt, and doesn't touch
                // memory.
                unsafe {
                    asm!("csrs mie, {bit}", bit = in(reg) bit, options(nostack));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_section_gate_nests_and_returns_value() {
        let gate = CriticalSectionGate;
        let value = gate.without_interrupts(|| gate.without_interrupts(|| 42));
        assert_eq!(value, 42);
    }
}

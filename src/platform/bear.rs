// Copyright 2025 Google LLC.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

use super::{Platform, UartPort};
use crate::{
    drivers::{
        plic::{PlicConfig, PlicRegisters},
        uart::{IrqBinding, UartConfig},
    },
    interrupts::Irq,
    mmio::Mmio,
};

/// Number of core-internal interrupt numbers, below the external sources.
pub const GENERIC_IRQS: u32 = 11;

/// The machine external interrupt line of the core.
pub const MACHINE_EXTERNAL_IRQ: Irq = Irq(11);

/// Number of external sources on the interrupt controller.
pub const PLIC_SOURCES: u32 = 64;

/// Size of the dispatch table: the generic interrupts, reserved source 0, then every source.
pub const IRQ_COUNT: usize = (GENERIC_IRQS + 1 + PLIC_SOURCES) as usize;

/// Frequency of the peripheral clock feeding the UARTs.
const PERIPHERAL_CLOCK_HZ: u32 = 20_000_000;

/// Base address of the interrupt controller's enable bits for context 0.
const PLIC_ENABLE_BASE_ADDRESS: *mut u32 = 0x0c00_2000 as _;

/// Base address of the interrupt controller's priority registers.
const PLIC_PRIORITY_BASE_ADDRESS: *mut u32 = 0x0c00_0000 as _;

/// Base address of the interrupt controller's context 0 threshold and claim registers.
const PLIC_CONTEXT_BASE_ADDRESS: *mut u32 = 0x0c20_0000 as _;

/// Address of the SoC register giving the maximum supported interrupt priority.
const MAX_PRIORITY_ADDRESS: *mut u32 = 0x0c1f_fffc as _;

/// The BEAR RISC-V SoC.
pub struct Bear;

impl Platform for Bear {
    const PLIC: PlicConfig = PlicConfig {
        generic_irqs: GENERIC_IRQS,
        external_line: MACHINE_EXTERNAL_IRQ,
    };

    const UART_PORTS: &'static [UartPort] = &[
        UartPort {
            name: "UART_0",
            base_address: 0x1001_0000,
            config: UartConfig {
                clock_freq: PERIPHERAL_CLOCK_HZ,
                baud_rate: 115_200,
            },
            binding: IrqBinding {
                irq: Irq(GENERIC_IRQS + 1),
                priority: 1,
            },
        },
        UartPort {
            name: "UART_1",
            base_address: 0x1001_1000,
            config: UartConfig {
                clock_freq: PERIPHERAL_CLOCK_HZ,
                baud_rate: 9600,
            },
            binding: IrqBinding {
                irq: Irq(GENERIC_IRQS + 2),
                priority: 1,
            },
        },
    ];

    unsafe fn plic_registers() -> PlicRegisters<Mmio> {
        // SAFETY: The various base addresses are valid and mapped, and our caller promised that
        // this is only called once so there are no aliases.
        unsafe {
            PlicRegisters::new(
                Mmio::new(PLIC_ENABLE_BASE_ADDRESS),
                Mmio::new(PLIC_PRIORITY_BASE_ADDRESS),
                Mmio::new(PLIC_CONTEXT_BASE_ADDRESS),
                Mmio::new(MAX_PRIORITY_ADDRESS),
            )
        }
    }
}

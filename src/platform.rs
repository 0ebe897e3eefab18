// Copyright 2025 Google LLC.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

pub mod bear;

pub use bear::Bear as PlatformImpl;

use crate::{
    Error,
    drivers::{
        plic::{Plic, PlicConfig, PlicRegisters},
        uart::{InterruptUart, IrqBinding, UartConfig, UartRegisters},
    },
    gate::{CoreLines, InterruptGate},
    mmio::{Mmio, RegisterBlock},
};
use log::info;

/// Static configuration of one UART port.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UartPort {
    pub name: &'static str,
    /// Physical address of the port's register block.
    pub base_address: usize,
    pub config: UartConfig,
    pub binding: IrqBinding,
}

/// Platform-specific code.
pub trait Platform {
    /// How the interrupt controller's sources map onto logical interrupt numbers.
    const PLIC: PlicConfig;

    /// The UART ports of the platform, in the order they are brought up.
    const UART_PORTS: &'static [UartPort];

    /// Returns the registers of the interrupt controller.
    ///
    /// # Safety
    ///
    /// This method must only be called once. Calling it multiple times would result in unsound
    /// mutable aliasing.
    unsafe fn plic_registers() -> PlicRegisters<Mmio>;

    /// Returns the registers of the given UART port.
    ///
    /// # Safety
    ///
    /// The port must be one of `UART_PORTS`, and this must only be called once for each port.
    unsafe fn uart_registers(port: &UartPort) -> UartRegisters<Mmio> {
        // SAFETY: Our caller promised that the port is one of ours, so its base address is that
        // of a UART, and that there are no other aliases.
        unsafe { UartRegisters::new(Mmio::new(port.base_address as *mut u32)) }
    }

    /// Brings up interrupt handling and then every UART port of the platform.
    ///
    /// `uarts` must have one driver for each of `UART_PORTS`, in the same order, otherwise nothing
    /// is initialised. The controller is fully initialised before any port registers its handler.
    fn boot<R, G, C, U, H, const N: usize>(
        plic: &'static Plic<R, G, C, N>,
        uarts: &'static [InterruptUart<U, H>],
    ) -> Result<(), Error>
    where
        R: RegisterBlock + Sync + 'static,
        G: InterruptGate + Sync + 'static,
        C: CoreLines + Sync + 'static,
        U: RegisterBlock + Sync + 'static,
        H: InterruptGate + Sync + 'static,
    {
        if uarts.len() != Self::UART_PORTS.len() {
            return Err(Error::PortCountMismatch {
                expected: Self::UART_PORTS.len(),
                found: uarts.len(),
            });
        }
        plic.init()?;
        for (uart, port) in uarts.iter().zip(Self::UART_PORTS) {
            uart.init(&port.config, port.binding, plic)?;
            info!("{} ready", port.name);
        }
        Ok(())
    }
}

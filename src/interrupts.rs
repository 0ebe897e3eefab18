// Copyright 2025 Google LLC.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

//! Logical interrupt numbers, the handler dispatch table and the interface drivers use to hook
//! into an interrupt controller.

use crate::Error;
use core::fmt::{self, Display, Formatter};
use log::trace;
use spin::mutex::SpinMutex;

/// A logical interrupt number, as used to index the dispatch table.
///
/// Numbers below the controller's generic boundary are core-internal interrupts (software, timer,
/// the external line itself); numbers above it are external sources managed by the interrupt
/// controller.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Irq(pub u32);

impl Display for Irq {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "IRQ {}", self.0)
    }
}

/// Something which can be called to handle an interrupt.
///
/// Handlers run in interrupt context on the interrupted core, so must not block waiting for
/// another interrupt.
pub trait InterruptHandler: Sync {
    /// Handles the given interrupt, which has been claimed but not yet completed.
    fn handle_irq(&self, irq: Irq);
}

impl<F: Fn(Irq) + Sync> InterruptHandler for F {
    fn handle_irq(&self, irq: Irq) {
        self(irq)
    }
}

pub type IrqHandler = &'static dyn InterruptHandler;

/// Maps logical interrupt numbers to their handlers.
///
/// Callers must keep interrupts masked while modifying the table, otherwise a handler lookup on
/// the same core could spin forever on the lock. [`InterruptController::connect`] does this.
pub struct DispatchTable<const N: usize> {
    handlers: [SpinMutex<Option<IrqHandler>>; N],
}

impl<const N: usize> DispatchTable<N> {
    /// Creates a table with no handlers registered.
    pub const fn new() -> Self {
        Self {
            handlers: [const { SpinMutex::new(None) }; N],
        }
    }

    fn entry(&self, irq: Irq) -> Result<&SpinMutex<Option<IrqHandler>>, Error> {
        self.handlers
            .get(irq.0 as usize)
            .ok_or(Error::OutOfRange(irq))
    }

    /// Sets the handler for the given interrupt.
    ///
    /// Returns the handler that was previously set, if any.
    pub fn set(&self, irq: Irq, handler: IrqHandler) -> Result<Option<IrqHandler>, Error> {
        trace!("Setting IRQ handler for {:?}", irq);
        Ok(self.entry(irq)?.lock().replace(handler))
    }

    /// Removes the handler for the given interrupt.
    ///
    /// Returns the handler that was previously set, if any.
    pub fn remove(&self, irq: Irq) -> Result<Option<IrqHandler>, Error> {
        trace!("Removing IRQ handler for {:?}", irq);
        Ok(self.entry(irq)?.lock().take())
    }

    /// Returns the handler for the given interrupt, if there is one.
    ///
    /// The lock is released before returning, so the handler is free to modify the table.
    pub fn get(&self, irq: Irq) -> Option<IrqHandler> {
        *self.entry(irq).ok()?.lock()
    }
}

impl<const N: usize> Default for DispatchTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// The operations a device driver needs from an interrupt controller to get its interrupt
/// delivered.
pub trait InterruptController {
    /// Registers `handler` for the given interrupt, and sets its priority if it is an external
    /// source.
    ///
    /// Returns the handler that was previously set, if any.
    fn connect(
        &self,
        irq: Irq,
        priority: u32,
        handler: IrqHandler,
    ) -> Result<Option<IrqHandler>, Error>;

    /// Removes the handler for the given interrupt.
    fn disconnect(&self, irq: Irq) -> Result<Option<IrqHandler>, Error>;

    /// Enables delivery of the given external source.
    fn enable(&self, irq: Irq) -> Result<(), Error>;

    /// Disables delivery of the given external source.
    fn disable(&self, irq: Irq) -> Result<(), Error>;

    /// Returns whether the given external source is enabled. Always false for interrupts the
    /// controller doesn't manage.
    fn is_enabled(&self, irq: Irq) -> bool;

    /// Sets the priority of the given external source, clamped to the hardware maximum.
    fn set_priority(&self, irq: Irq, priority: u32) -> Result<(), Error>;
}

// Copyright 2025 Google LLC.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

//! Driver for the BEAR platform-level interrupt controller.
//!
//! All external sources share the core's machine external interrupt line. When it fires, the
//! shared handler claims the highest-priority pending source from the controller, calls the
//! handler registered for it, and then writes the same source back to complete it. Reading the
//! claim register is destructive, so it is read exactly once per trap.

use crate::{
    Error,
    gate::{CoreLines, InterruptGate},
    interrupts::{DispatchTable, InterruptController, InterruptHandler, Irq, IrqHandler},
    mmio::RegisterBlock,
};
use core::sync::atomic::{AtomicU32, Ordering};
use log::{debug, info, trace};

/// Offset of the priority threshold register within the context block.
const THRESHOLD: usize = 0x0;
/// Offset of the claim/complete register within the context block.
const CLAIM_COMPLETE: usize = 0x4;

/// The register regions of the interrupt controller.
///
/// The regions are not contiguous on the BEAR SoC, so each has its own register block.
pub struct PlicRegisters<R> {
    /// One enable bit per source id, 32 per word.
    enable: R,
    /// One priority word per source id, indexed from id 0.
    priority: R,
    /// The context block of this core: priority threshold then claim/complete.
    context: R,
    /// The single read-only word giving the highest priority the hardware supports.
    max_priority: R,
}

impl<R: RegisterBlock> PlicRegisters<R> {
    pub const fn new(enable: R, priority: R, context: R, max_priority: R) -> Self {
        Self {
            enable,
            priority,
            context,
            max_priority,
        }
    }

    fn enable_word(&self, index: usize) -> u32 {
        self.enable.read(index * 4)
    }

    fn set_enable_word(&self, index: usize, value: u32) {
        self.enable.write(index * 4, value);
    }

    fn priority(&self, id: u32) -> u32 {
        self.priority.read(id as usize * 4)
    }

    fn set_priority(&self, id: u32, priority: u32) {
        self.priority.write(id as usize * 4, priority);
    }

    fn set_threshold(&self, threshold: u32) {
        self.context.write(THRESHOLD, threshold);
    }

    fn claim(&self) -> u32 {
        self.context.read(CLAIM_COMPLETE)
    }

    fn complete(&self, id: u32) {
        self.context.write(CLAIM_COMPLETE, id);
    }

    fn max_priority(&self) -> u32 {
        self.max_priority.read(0)
    }
}

/// How the controller's sources map onto logical interrupt numbers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PlicConfig {
    /// Number of core-internal interrupt numbers. Controller source id `n` is logical interrupt
    /// `generic_irqs + n`.
    pub generic_irqs: u32,
    /// The core interrupt line the controller is wired to.
    pub external_line: Irq,
}

/// The platform-level interrupt controller, along with the dispatch table for all logical
/// interrupts of the core.
///
/// `N` is the size of the dispatch table: the generic interrupts, the reserved source id 0, and
/// every external source.
pub struct Plic<R, G, C, const N: usize> {
    registers: PlicRegisters<R>,
    config: PlicConfig,
    table: DispatchTable<N>,
    gate: G,
    lines: C,
    /// The raw value read from the claim register by the most recent trap.
    claimed: AtomicU32,
    spurious: AtomicU32,
}

impl<R: RegisterBlock, G: InterruptGate, C: CoreLines, const N: usize> Plic<R, G, C, N> {
    /// Creates a driver for the given controller registers. Nothing is written until `init`.
    pub const fn new(registers: PlicRegisters<R>, config: PlicConfig, gate: G, lines: C) -> Self {
        assert!(
            config.generic_irqs < N as u32,
            "Dispatch table too small for the generic interrupts"
        );
        assert!(config.external_line.0 <= config.generic_irqs);
        Self {
            registers,
            config,
            table: DispatchTable::new(),
            gate,
            lines,
            claimed: AtomicU32::new(0),
            spurious: AtomicU32::new(0),
        }
    }

    /// Returns the number of external sources managed by the controller.
    pub const fn sources(&self) -> u32 {
        N as u32 - 1 - self.config.generic_irqs
    }

    /// Returns the controller's source id for the given interrupt, if it manages it.
    fn source_id(&self, irq: Irq) -> Result<u32, Error> {
        match irq.0.checked_sub(self.config.generic_irqs) {
            Some(id) if id >= 1 && id <= self.sources() => Ok(id),
            _ => Err(Error::NotManaged(irq)),
        }
    }

    fn enable_words(&self) -> usize {
        (self.sources() as usize + 32) / 32
    }

    fn update_enable(&self, irq: Irq, enabled: bool) -> Result<(), Error> {
        let id = self.source_id(irq)?;
        let (word, bit) = (id as usize / 32, 1 << (id % 32));
        self.gate.without_interrupts(|| {
            let value = self.registers.enable_word(word);
            let value = if enabled { value | bit } else { value & !bit };
            self.registers.set_enable_word(word, value);
        });
        Ok(())
    }

    /// Returns the current priority of the given external source.
    pub fn priority(&self, irq: Irq) -> Result<u32, Error> {
        let id = self.source_id(irq)?;
        Ok(self.registers.priority(id))
    }

    /// Sets the priority threshold of this core's context, clamped to the hardware maximum.
    /// Sources with a priority at or below the threshold are not delivered.
    pub fn set_threshold(&self, threshold: u32) {
        let threshold = threshold.min(self.registers.max_priority());
        debug!("Setting priority threshold to {}", threshold);
        self.registers.set_threshold(threshold);
    }

    /// Returns the raw source id most recently read from the claim register.
    ///
    /// The claim register clears on read, so handlers which need the id of the source being
    /// completed must use this (or the `Irq` they are passed) rather than reading it again.
    pub fn current_claimed_source(&self) -> u32 {
        self.claimed.load(Ordering::SeqCst)
    }

    /// Returns how many claims have been dropped for being zero or out of range.
    pub fn spurious_count(&self) -> u32 {
        self.spurious.load(Ordering::Relaxed)
    }

    /// Claims the pending external source, calls its handler and then completes it.
    ///
    /// This is the handler for the machine external interrupt line. A claim of 0 (nothing pending
    /// for this core) or past the last source is dropped without being completed.
    ///
    /// Panics if there is no registered handler for a valid claim.
    pub fn handle_external(&self) {
        let claim = self.registers.claim();
        self.claimed.store(claim, Ordering::SeqCst);

        if claim == 0 || claim > self.sources() {
            trace!("Spurious claim {}", claim);
            self.spurious.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.dispatch(Irq(self.config.generic_irqs + claim));
        self.registers.complete(claim);
    }

    /// Calls the handler registered for the given logical interrupt.
    ///
    /// This should be called from the core's trap handler for every interrupt it takes.
    ///
    /// Panics if there is no registered handler for the interrupt.
    pub fn dispatch(&self, irq: Irq) {
        trace!("IRQ: {:?}", irq);
        if let Some(handler) = self.table.get(irq) {
            handler.handle_irq(irq);
        } else {
            panic!("Unexpected {} with no handler", irq);
        }
    }
}

impl<R, G, C, const N: usize> Plic<R, G, C, N>
where
    R: RegisterBlock + Sync + 'static,
    G: InterruptGate + Sync + 'static,
    C: CoreLines + Sync + 'static,
{
    /// Performs controller initialisation on boot, ready to start handling interrupts.
    ///
    /// Disables every source and zeroes every priority and the threshold before installing the
    /// shared handler and unmasking the external line, so nothing is dispatched based on stale
    /// state.
    pub fn init(&'static self) -> Result<(), Error> {
        for word in 0..self.enable_words() {
            self.registers.set_enable_word(word, 0);
        }
        for id in 1..=self.sources() {
            self.registers.set_priority(id, 0);
        }
        self.registers.set_threshold(0);

        self.gate
            .without_interrupts(|| self.table.set(self.config.external_line, self))?;
        self.lines.unmask(self.config.external_line);

        info!(
            "Interrupt controller ready with {} sources on {}",
            self.sources(),
            self.config.external_line
        );
        Ok(())
    }
}

impl<R, G, C, const N: usize> InterruptHandler for Plic<R, G, C, N>
where
    R: RegisterBlock + Sync,
    G: InterruptGate + Sync,
    C: CoreLines + Sync,
{
    fn handle_irq(&self, _irq: Irq) {
        self.handle_external();
    }
}

impl<R: RegisterBlock, G: InterruptGate, C: CoreLines, const N: usize> InterruptController
    for Plic<R, G, C, N>
{
    fn connect(
        &self,
        irq: Irq,
        priority: u32,
        handler: IrqHandler,
    ) -> Result<Option<IrqHandler>, Error> {
        debug!("Connecting handler for {} at priority {}", irq, priority);
        if irq == self.config.external_line {
            return Err(Error::Reserved(irq));
        }
        let previous = self
            .gate
            .without_interrupts(|| self.table.set(irq, handler))?;
        if self.source_id(irq).is_ok() {
            self.set_priority(irq, priority)?;
        }
        Ok(previous)
    }

    fn disconnect(&self, irq: Irq) -> Result<Option<IrqHandler>, Error> {
        debug!("Disconnecting handler for {}", irq);
        if irq == self.config.external_line {
            return Err(Error::Reserved(irq));
        }
        self.gate.without_interrupts(|| self.table.remove(irq))
    }

    fn enable(&self, irq: Irq) -> Result<(), Error> {
        debug!("Enabling {}", irq);
        self.update_enable(irq, true)
    }

    fn disable(&self, irq: Irq) -> Result<(), Error> {
        debug!("Disabling {}", irq);
        self.update_enable(irq, false)
    }

    fn is_enabled(&self, irq: Irq) -> bool {
        match self.source_id(irq) {
            Ok(id) => self.registers.enable_word(id as usize / 32) & (1 << (id % 32)) != 0,
            Err(_) => false,
        }
    }

    fn set_priority(&self, irq: Irq, priority: u32) -> Result<(), Error> {
        let id = self.source_id(irq)?;
        let priority = priority.min(self.registers.max_priority());
        debug!("Setting priority of {} to {}", irq, priority);
        self.registers.set_priority(id, priority);
        Ok(())
    }
}

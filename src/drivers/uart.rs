// Copyright 2025 Google LLC.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

//! Driver for the BEAR UART, with separate TX and RX FIFOs.
//!
//! [`PolledUart`] only supports blocking polled I/O. [`InterruptUart`] additionally registers an
//! interrupt handler with the interrupt controller and forwards each interrupt to a callback
//! installed by the application, which moves data with the partial FIFO operations.

use crate::{
    Error,
    gate::{CriticalSectionGate, InterruptGate},
    interrupts::{InterruptController, InterruptHandler, Irq},
    mmio::RegisterBlock,
};
use bitflags::bitflags;
use core::{convert::Infallible, hint::spin_loop};
use embedded_io::{ErrorType, Read, ReadReady, Write, WriteReady};
use log::{info, warn};
use spin::mutex::SpinMutex;

/// Byte offsets of the UART registers. Each register is followed by a reserved word.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(usize)]
pub enum UartRegister {
    TxData = 0x00,
    RxData = 0x08,
    TxCtrl = 0x10,
    RxCtrl = 0x18,
    Status = 0x20,
    Error = 0x28,
    BaudDiv = 0x30,
    InterruptEnable = 0x38,
    InterruptPending = 0x40,
}

/// Enable bit of the TX and RX control registers.
const CTRL_ENABLE: u32 = 1 << 0;
/// Shift of the FIFO trigger count in the TX and RX control registers.
const CTRL_COUNT_SHIFT: u32 = 16;
const TX_TRIGGER_COUNT: u32 = 8;
const RX_TRIGGER_COUNT: u32 = 0;

bitflags! {
    /// Flags from the UART status register.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct LineStatus: u32 {
        const TX_FULL = 1 << 0;
        const RX_EMPTY = 1 << 1;
        const TX_EMPTY = 1 << 2;
        const TX_IDLE = 1 << 3;
    }
}

bitflags! {
    /// Interrupt classes, as used by the interrupt enable and pending registers.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Interrupts: u32 {
        const TX = 1 << 0;
        const RX = 1 << 1;
    }
}

/// Clock and line settings for a UART port.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UartConfig {
    /// Frequency of the peripheral reference clock, in Hz.
    pub clock_freq: u32,
    pub baud_rate: u32,
}

impl UartConfig {
    /// Returns the baud rate divisor for this configuration.
    pub fn divisor(&self) -> Result<u32, Error> {
        match self.clock_freq.checked_div(self.baud_rate) {
            Some(divisor) if divisor != 0 => Ok(divisor),
            _ => Err(Error::InvalidBaudRate {
                clock_freq: self.clock_freq,
                baud_rate: self.baud_rate,
            }),
        }
    }
}

/// The interrupt a UART port is wired to, and the priority to give it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IrqBinding {
    pub irq: Irq,
    pub priority: u32,
}

/// The registers of one UART port.
///
/// Status is always read from the device, never cached.
pub struct UartRegisters<R> {
    block: R,
}

impl<R: RegisterBlock> UartRegisters<R> {
    pub const fn new(block: R) -> Self {
        Self { block }
    }

    fn read(&self, register: UartRegister) -> u32 {
        self.block.read(register as usize)
    }

    fn write(&self, register: UartRegister, value: u32) {
        self.block.write(register as usize, value);
    }

    /// Sets the baud rate divisor, enables both directions and masks all UART interrupts.
    fn configure(&self, config: &UartConfig) -> Result<(), Error> {
        let divisor = config.divisor().inspect_err(|e| warn!("{}", e))?;
        self.write(UartRegister::BaudDiv, divisor);
        self.write(
            UartRegister::TxCtrl,
            CTRL_ENABLE | TX_TRIGGER_COUNT << CTRL_COUNT_SHIFT,
        );
        self.write(
            UartRegister::RxCtrl,
            CTRL_ENABLE | RX_TRIGGER_COUNT << CTRL_COUNT_SHIFT,
        );
        self.write(UartRegister::InterruptEnable, 0);
        Ok(())
    }

    pub fn line_status(&self) -> LineStatus {
        LineStatus::from_bits_retain(self.read(UartRegister::Status))
    }

    fn write_byte(&self, byte: u8) {
        self.write(UartRegister::TxData, byte.into());
    }

    fn read_byte(&self) -> u8 {
        self.read(UartRegister::RxData) as u8
    }

    fn poll_write(&self, byte: u8) -> u8 {
        while self.line_status().contains(LineStatus::TX_FULL) {
            spin_loop();
        }
        self.write_byte(byte);
        byte
    }

    fn poll_read(&self) -> Option<u8> {
        if self.line_status().contains(LineStatus::RX_EMPTY) {
            None
        } else {
            Some(self.read_byte())
        }
    }

    fn fifo_fill(&self, bytes: &[u8]) -> usize {
        let mut written = 0;
        for &byte in bytes {
            if self.line_status().contains(LineStatus::TX_FULL) {
                break;
            }
            self.write_byte(byte);
            written += 1;
        }
        written
    }

    fn fifo_drain(&self, buffer: &mut [u8]) -> usize {
        let mut read = 0;
        for slot in buffer {
            if self.line_status().contains(LineStatus::RX_EMPTY) {
                break;
            }
            *slot = self.read_byte();
            read += 1;
        }
        read
    }

    fn interrupt_enable(&self) -> Interrupts {
        Interrupts::from_bits_retain(self.read(UartRegister::InterruptEnable))
    }

    fn set_interrupt_enable(&self, interrupts: Interrupts) {
        self.write(UartRegister::InterruptEnable, interrupts.bits());
    }

    fn interrupt_pending(&self) -> Interrupts {
        Interrupts::from_bits_retain(self.read(UartRegister::InterruptPending))
    }

    /// Writes all of `buf`, blocking while the TX FIFO is full.
    fn write_blocking(&self, buf: &[u8]) -> usize {
        for &byte in buf {
            self.poll_write(byte);
        }
        buf.len()
    }

    /// Blocks until at least one byte is available, then reads as many as are available.
    fn read_blocking(&self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }
        loop {
            let read = self.fifo_drain(buf);
            if read != 0 {
                return read;
            }
            spin_loop();
        }
    }

    /// Blocks until everything written has left the transmitter.
    fn flush(&self) {
        let done = LineStatus::TX_EMPTY | LineStatus::TX_IDLE;
        while !self.line_status().contains(done) {
            spin_loop();
        }
    }
}

/// Polled operations supported by every UART port.
///
/// The blocking operations spin on the hardware with no timeout, and must not be called from
/// interrupt context.
pub trait SerialPort {
    /// Waits until the TX FIFO has room, then writes the byte to it. Returns the byte written.
    fn poll_write(&self, byte: u8) -> u8;

    /// Reads one byte if the RX FIFO has one, without blocking.
    fn poll_read(&self) -> Option<u8>;

    /// Returns the raw contents of the error register.
    fn error_status(&self) -> u32;

    /// Returns a fresh snapshot of the status register.
    fn line_status(&self) -> LineStatus;

    /// Returns whether the TX FIFO is empty.
    fn tx_empty(&self) -> bool {
        self.line_status().contains(LineStatus::TX_EMPTY)
    }

    /// Returns whether the transmitter is idle, with nothing being shifted out.
    fn tx_idle(&self) -> bool {
        self.line_status().contains(LineStatus::TX_IDLE)
    }
}

/// Callback invoked from a port's interrupt handler.
///
/// It must call [`InterruptSerial::refresh`] first, then service whichever of TX and RX is ready.
/// If it leaves a condition pending with its interrupt enabled, the interrupt fires again as soon
/// as it is completed.
pub type UartCallback = &'static (dyn Fn(&dyn InterruptSerial) + Sync);

/// Interrupt-driven operations of a UART port.
///
/// The FIFO operations transfer as much as the hardware allows and return how much that was, so
/// callers must loop until a whole transfer is done.
pub trait InterruptSerial: SerialPort {
    /// Writes bytes from the start of `bytes` until the TX FIFO is full. Returns how many were
    /// written, which may be 0.
    fn fifo_fill(&self, bytes: &[u8]) -> usize;

    /// Reads bytes into the start of `buffer` until the RX FIFO is empty or `buffer` is full.
    /// Returns how many were read, which may be 0.
    fn fifo_drain(&self, buffer: &mut [u8]) -> usize;

    /// Enables or disables the TX ready interrupt.
    fn set_tx_interrupt(&self, enabled: bool);

    /// Enables or disables the RX ready interrupt.
    fn set_rx_interrupt(&self, enabled: bool);

    /// Returns whether a TX interrupt is pending.
    fn tx_ready(&self) -> bool;

    /// Returns whether an RX interrupt is pending.
    fn rx_ready(&self) -> bool;

    /// Returns whether any interrupt is pending.
    fn any_pending(&self) -> bool;

    /// Must be called at the start of every callback, before checking what is pending.
    ///
    /// Nothing needs latching on this UART, so this always returns true.
    fn refresh(&self) -> bool;

    /// Installs the callback for this port's interrupts, replacing any previous one. `None`
    /// stops interrupts reaching the application, but doesn't mask them.
    fn set_callback(&self, callback: Option<UartCallback>);
}

/// A UART port used without interrupts.
pub struct PolledUart<R> {
    registers: UartRegisters<R>,
}

impl<R: RegisterBlock> PolledUart<R> {
    /// Configures the port and returns a driver for it.
    pub fn init(registers: UartRegisters<R>, config: &UartConfig) -> Result<Self, Error> {
        registers.configure(config)?;
        info!("UART configured for {} baud", config.baud_rate);
        Ok(Self { registers })
    }
}

impl<R: RegisterBlock> SerialPort for PolledUart<R> {
    fn poll_write(&self, byte: u8) -> u8 {
        self.registers.poll_write(byte)
    }

    fn poll_read(&self) -> Option<u8> {
        self.registers.poll_read()
    }

    fn error_status(&self) -> u32 {
        self.registers.read(UartRegister::Error)
    }

    fn line_status(&self) -> LineStatus {
        self.registers.line_status()
    }
}

/// A UART port delivering its interrupts to an application callback.
///
/// The port must live for `'static`, as the interrupt controller keeps a reference to it.
pub struct InterruptUart<R, G = CriticalSectionGate> {
    registers: UartRegisters<R>,
    gate: G,
    callback: SpinMutex<Option<UartCallback>>,
}

impl<R: RegisterBlock, G: InterruptGate> InterruptUart<R, G> {
    /// Creates a driver for the given port. Nothing is written until `init`.
    pub const fn new(registers: UartRegisters<R>, gate: G) -> Self {
        Self {
            registers,
            gate,
            callback: SpinMutex::new(None),
        }
    }

    fn update_interrupts(&self, interrupts: Interrupts, enabled: bool) {
        self.gate.without_interrupts(|| {
            let mut enable = self.registers.interrupt_enable();
            enable.set(interrupts, enabled);
            self.registers.set_interrupt_enable(enable);
        });
    }
}

impl<R, G> InterruptUart<R, G>
where
    R: RegisterBlock + Sync + 'static,
    G: InterruptGate + Sync + 'static,
{
    /// Configures the port, then registers it with the interrupt controller and enables its
    /// interrupt.
    ///
    /// The UART's own interrupts start masked; the application enables TX or RX once it has set a
    /// callback.
    pub fn init(
        &'static self,
        config: &UartConfig,
        binding: IrqBinding,
        controller: &impl InterruptController,
    ) -> Result<(), Error> {
        self.registers.configure(config)?;
        // Rejects sources the controller doesn't manage before any handler is replaced.
        controller.set_priority(binding.irq, binding.priority)?;
        controller.connect(binding.irq, binding.priority, self)?;
        controller.enable(binding.irq)?;
        info!(
            "UART configured for {} baud on {}",
            config.baud_rate, binding.irq
        );
        Ok(())
    }
}

impl<R: RegisterBlock, G: InterruptGate> SerialPort for InterruptUart<R, G> {
    fn poll_write(&self, byte: u8) -> u8 {
        self.registers.poll_write(byte)
    }

    fn poll_read(&self) -> Option<u8> {
        self.registers.poll_read()
    }

    fn error_status(&self) -> u32 {
        self.registers.read(UartRegister::Error)
    }

    fn line_status(&self) -> LineStatus {
        self.registers.line_status()
    }
}

impl<R: RegisterBlock, G: InterruptGate> InterruptSerial for InterruptUart<R, G> {
    fn fifo_fill(&self, bytes: &[u8]) -> usize {
        self.registers.fifo_fill(bytes)
    }

    fn fifo_drain(&self, buffer: &mut [u8]) -> usize {
        self.registers.fifo_drain(buffer)
    }

    fn set_tx_interrupt(&self, enabled: bool) {
        self.update_interrupts(Interrupts::TX, enabled);
    }

    fn set_rx_interrupt(&self, enabled: bool) {
        self.update_interrupts(Interrupts::RX, enabled);
    }

    fn tx_ready(&self) -> bool {
        self.registers.interrupt_pending().contains(Interrupts::TX)
    }

    fn rx_ready(&self) -> bool {
        self.registers.interrupt_pending().contains(Interrupts::RX)
    }

    fn any_pending(&self) -> bool {
        self.registers.interrupt_pending().intersects(Interrupts::all())
    }

    fn refresh(&self) -> bool {
        true
    }

    fn set_callback(&self, callback: Option<UartCallback>) {
        self.gate
            .without_interrupts(|| *self.callback.lock() = callback);
    }
}

impl<R, G> InterruptHandler for InterruptUart<R, G>
where
    R: RegisterBlock + Sync,
    G: InterruptGate + Sync,
{
    fn handle_irq(&self, _irq: Irq) {
        // Copy the callback out so that it can replace itself.
        let callback = *self.callback.lock();
        if let Some(callback) = callback {
            let port: &dyn InterruptSerial = self;
            callback(port);
        }
    }
}

impl<R> ErrorType for PolledUart<R> {
    type Error = Infallible;
}

impl<R: RegisterBlock> Write for PolledUart<R> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(self.registers.write_blocking(buf))
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.registers.flush();
        Ok(())
    }
}

impl<R: RegisterBlock> WriteReady for PolledUart<R> {
    fn write_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.line_status().contains(LineStatus::TX_FULL))
    }
}

impl<R: RegisterBlock> Read for PolledUart<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(self.registers.read_blocking(buf))
    }
}

impl<R: RegisterBlock> ReadReady for PolledUart<R> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.line_status().contains(LineStatus::RX_EMPTY))
    }
}

impl<R, G> ErrorType for &InterruptUart<R, G> {
    type Error = Infallible;
}

impl<R: RegisterBlock, G: InterruptGate> Write for &InterruptUart<R, G> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(self.registers.write_blocking(buf))
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.registers.flush();
        Ok(())
    }
}

impl<R: RegisterBlock, G: InterruptGate> WriteReady for &InterruptUart<R, G> {
    fn write_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.line_status().contains(LineStatus::TX_FULL))
    }
}

impl<R: RegisterBlock, G: InterruptGate> Read for &InterruptUart<R, G> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(self.registers.read_blocking(buf))
    }
}

impl<R: RegisterBlock, G: InterruptGate> ReadReady for &InterruptUart<R, G> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.line_status().contains(LineStatus::RX_EMPTY))
    }
}

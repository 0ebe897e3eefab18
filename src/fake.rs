// Copyright 2025 Google LLC.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

//! Simulated hardware for tests.
//!
//! Never hold a model guard while calling into a driver using the same fake: every register
//! access locks the model.

use crate::{
    drivers::{
        plic::PlicRegisters,
        uart::{Interrupts, LineStatus, UartRegister},
    },
    gate::{CoreLines, InterruptGate},
    interrupts::Irq,
    mmio::RegisterBlock,
};
use spin::mutex::{SpinMutex, SpinMutexGuard};
use std::{collections::VecDeque, sync::Arc};

/// Leaks a value to get a `'static` reference, for things the dispatch table must hold.
pub fn leak<T: 'static>(value: T) -> &'static T {
    Box::leak(Box::new(value))
}

/// Something observable that happened to the simulated interrupt controller or core.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    Enable { word: usize, value: u32 },
    Priority { id: usize, value: u32 },
    Threshold(u32),
    Claim(u32),
    Complete(u32),
    Unmask(Irq),
    GateEnter,
    GateExit,
    /// Recorded by test handlers.
    Handler(Irq),
}

pub struct PlicModel {
    pub enable: Vec<u32>,
    pub priority: Vec<u32>,
    pub threshold: u32,
    pub max_priority: u32,
    /// Source ids the claim register will return, in order. Empty means it returns 0.
    pub pending: VecDeque<u32>,
    pub events: Vec<Event>,
}

/// A simulated interrupt controller, along with the core's gate and lines.
#[derive(Clone)]
pub struct FakePlic {
    model: Arc<SpinMutex<PlicModel>>,
}

impl FakePlic {
    /// Creates a controller with the given number of sources, in a dirty state: everything
    /// enabled, every priority at the maximum.
    pub fn new(sources: u32, max_priority: u32) -> Self {
        let sources = sources as usize;
        Self {
            model: Arc::new(SpinMutex::new(PlicModel {
                enable: vec![u32::MAX; (sources + 32) / 32],
                priority: vec![max_priority; sources + 1],
                threshold: max_priority,
                max_priority,
                pending: VecDeque::new(),
                events: Vec::new(),
            })),
        }
    }

    pub fn registers(&self) -> PlicRegisters<PlicRegion> {
        let region = |kind: RegionKind| PlicRegion {
            model: self.model.clone(),
            kind,
        };
        PlicRegisters::new(
            region(RegionKind::Enable),
            region(RegionKind::Priority),
            region(RegionKind::Context),
            region(RegionKind::MaxPriority),
        )
    }

    pub fn gate(&self) -> FakeGate {
        FakeGate {
            model: self.model.clone(),
        }
    }

    pub fn lines(&self) -> FakeLines {
        FakeLines {
            model: self.model.clone(),
        }
    }

    pub fn model(&self) -> SpinMutexGuard<'_, PlicModel> {
        self.model.lock()
    }

    /// Makes the given source id the next one returned by the claim register.
    pub fn raise(&self, id: u32) {
        self.model.lock().pending.push_back(id);
    }

    pub fn record(&self, event: Event) {
        self.model.lock().events.push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.model.lock().events.clone()
    }

    pub fn clear_events(&self) {
        self.model.lock().events.clear();
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum RegionKind {
    Enable,
    Priority,
    Context,
    MaxPriority,
}

pub struct PlicRegion {
    model: Arc<SpinMutex<PlicModel>>,
    kind: RegionKind,
}

impl RegisterBlock for PlicRegion {
    fn read(&self, offset: usize) -> u32 {
        let mut model = self.model.lock();
        match (self.kind, offset) {
            (RegionKind::Enable, _) => model.enable[offset / 4],
            (RegionKind::Priority, _) => model.priority[offset / 4],
            (RegionKind::Context, 0x0) => model.threshold,
            (RegionKind::Context, 0x4) => {
                let claim = model.pending.pop_front().unwrap_or(0);
                model.events.push(Event::Claim(claim));
                claim
            }
            (RegionKind::MaxPriority, 0x0) => model.max_priority,
            _ => panic!("Read from unexpected offset {offset:#x} of {:?}", self.kind),
        }
    }

    fn write(&self, offset: usize, value: u32) {
        let mut model = self.model.lock();
        let event = match (self.kind, offset) {
            (RegionKind::Enable, _) => {
                model.enable[offset / 4] = value;
                Event::Enable {
                    word: offset / 4,
                    value,
                }
            }
            (RegionKind::Priority, _) => {
                model.priority[offset / 4] = value;
                Event::Priority {
                    id: offset / 4,
                    value,
                }
            }
            (RegionKind::Context, 0x0) => {
                model.threshold = value;
                Event::Threshold(value)
            }
            (RegionKind::Context, 0x4) => Event::Complete(value),
            _ => panic!("Write to unexpected offset {offset:#x} of {:?}", self.kind),
        };
        model.events.push(event);
    }
}

/// Records entry to and exit from the gate.
pub struct FakeGate {
    model: Arc<SpinMutex<PlicModel>>,
}

impl InterruptGate for FakeGate {
    fn without_interrupts<T>(&self, f: impl FnOnce() -> T) -> T {
        self.model.lock().events.push(Event::GateEnter);
        let result = f();
        self.model.lock().events.push(Event::GateExit);
        result
    }
}

/// Records core interrupt lines being unmasked.
pub struct FakeLines {
    model: Arc<SpinMutex<PlicModel>>,
}

impl CoreLines for FakeLines {
    fn unmask(&self, irq: Irq) {
        self.model.lock().events.push(Event::Unmask(irq));
    }
}

const TX_DATA: usize = UartRegister::TxData as usize;
const RX_DATA: usize = UartRegister::RxData as usize;
const TX_CTRL: usize = UartRegister::TxCtrl as usize;
const RX_CTRL: usize = UartRegister::RxCtrl as usize;
const STATUS: usize = UartRegister::Status as usize;
const ERROR: usize = UartRegister::Error as usize;
const BAUD_DIV: usize = UartRegister::BaudDiv as usize;
const INTERRUPT_ENABLE: usize = UartRegister::InterruptEnable as usize;
const INTERRUPT_PENDING: usize = UartRegister::InterruptPending as usize;

#[derive(Default)]
pub struct UartModel {
    pub tx_depth: usize,
    /// Bytes written but not yet shifted out.
    pub tx_fifo: VecDeque<u8>,
    /// Bytes shifted out of the transmitter.
    pub wire: Vec<u8>,
    /// Bytes written while the TX FIFO was full.
    pub dropped: usize,
    /// Whether the transmitter is still shifting out a byte.
    pub tx_busy: bool,
    pub rx_fifo: VecDeque<u8>,
    pub tx_ctrl: u32,
    pub rx_ctrl: u32,
    pub baud_div: u32,
    pub error: u32,
    pub interrupt_enable: u32,
    /// Every register write, in order.
    pub writes: Vec<(usize, u32)>,
}

impl UartModel {
    fn status(&self) -> LineStatus {
        let mut status = LineStatus::empty();
        status.set(LineStatus::TX_FULL, self.tx_fifo.len() >= self.tx_depth);
        status.set(LineStatus::RX_EMPTY, self.rx_fifo.is_empty());
        status.set(LineStatus::TX_EMPTY, self.tx_fifo.is_empty());
        status.set(
            LineStatus::TX_IDLE,
            self.tx_fifo.is_empty() && !self.tx_busy,
        );
        status
    }

    /// The pending interrupts: TX whenever there is room to write, RX whenever there is data,
    /// each only while enabled.
    fn pending(&self) -> Interrupts {
        let mut pending = Interrupts::empty();
        pending.set(Interrupts::TX, self.tx_fifo.len() < self.tx_depth);
        pending.set(Interrupts::RX, !self.rx_fifo.is_empty());
        pending & Interrupts::from_bits_retain(self.interrupt_enable)
    }
}

/// A simulated UART with a bounded TX FIFO and an unbounded RX FIFO.
#[derive(Clone)]
pub struct FakeUart {
    model: Arc<SpinMutex<UartModel>>,
}

impl FakeUart {
    pub fn new(tx_depth: usize) -> Self {
        Self {
            model: Arc::new(SpinMutex::new(UartModel {
                tx_depth,
                ..Default::default()
            })),
        }
    }

    pub fn model(&self) -> SpinMutexGuard<'_, UartModel> {
        self.model.lock()
    }

    /// Queues bytes as if they had arrived on the line.
    pub fn receive(&self, bytes: &[u8]) {
        self.model.lock().rx_fifo.extend(bytes);
    }

    /// Moves up to `count` bytes from the TX FIFO onto the wire.
    pub fn shift_out(&self, count: usize) {
        let mut model = self.model.lock();
        for _ in 0..count {
            let Some(byte) = model.tx_fifo.pop_front() else {
                break;
            };
            model.wire.push(byte);
        }
    }

    pub fn wire(&self) -> Vec<u8> {
        self.model.lock().wire.clone()
    }
}

impl RegisterBlock for FakeUart {
    fn read(&self, offset: usize) -> u32 {
        let mut model = self.model.lock();
        match offset {
            RX_DATA => model.rx_fifo.pop_front().unwrap_or(0).into(),
            TX_CTRL => model.tx_ctrl,
            RX_CTRL => model.rx_ctrl,
            STATUS => model.status().bits(),
            ERROR => model.error,
            BAUD_DIV => model.baud_div,
            INTERRUPT_ENABLE => model.interrupt_enable,
            INTERRUPT_PENDING => model.pending().bits(),
            _ => panic!("Read from unexpected UART offset {offset:#x}"),
        }
    }

    fn write(&self, offset: usize, value: u32) {
        let mut model = self.model.lock();
        model.writes.push((offset, value));
        match offset {
            TX_DATA => {
                if model.tx_fifo.len() < model.tx_depth {
                    model.tx_fifo.push_back(value as u8);
                } else {
                    model.dropped += 1;
                }
            }
            TX_CTRL => model.tx_ctrl = value,
            RX_CTRL => model.rx_ctrl = value,
            BAUD_DIV => model.baud_div = value,
            INTERRUPT_ENABLE => model.interrupt_enable = value,
            STATUS | ERROR | INTERRUPT_PENDING | RX_DATA => {}
            _ => panic!("Write to unexpected UART offset {offset:#x}"),
        }
    }
}

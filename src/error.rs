// Copyright 2025 Google LLC.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

use crate::interrupts::Irq;
use core::fmt::{self, Display, Formatter};

/// Errors returned by controller and UART configuration calls.
///
/// None of these are raised from interrupt context: a rejected call leaves the hardware untouched.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// The interrupt is not one of the external sources managed by the interrupt controller.
    NotManaged(Irq),
    /// The interrupt number doesn't fit in the dispatch table.
    OutOfRange(Irq),
    /// The interrupt line is owned by the interrupt controller itself.
    Reserved(Irq),
    /// A different number of UART drivers was given than the platform has ports.
    PortCountMismatch { expected: usize, found: usize },
    /// The baud rate is zero, or too high to give a non-zero divisor for the clock.
    InvalidBaudRate { clock_freq: u32, baud_rate: u32 },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::NotManaged(irq) => {
                write!(f, "{irq} is not managed by the interrupt controller")
            }
            Self::OutOfRange(irq) => write!(f, "{irq} is outside the dispatch table"),
            Self::Reserved(irq) => write!(f, "{irq} is reserved for the interrupt controller"),
            Self::PortCountMismatch { expected, found } => {
                write!(f, "Platform has {expected} UART ports but {found} drivers were given")
            }
            Self::InvalidBaudRate {
                clock_freq,
                baud_rate,
            } => write!(
                f,
                "Baud rate {baud_rate} is not achievable with a {clock_freq} Hz clock"
            ),
        }
    }
}

impl core::error::Error for Error {}

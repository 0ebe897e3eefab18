// Copyright 2025 Google LLC.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

use core::convert::Infallible;
use embedded_io::{ErrorType, Read, Write};
use spin::mutex::SpinMutex;

/// A console guarded by a spin mutex so that it may be shared between threads.
///
/// Must not be used from an interrupt handler while the same core may hold the lock, or the
/// handler will spin forever.
pub struct SharedConsole<T: Send> {
    console: SpinMutex<T>,
}

impl<T: Send> SharedConsole<T> {
    pub const fn new(console: T) -> Self {
        Self {
            console: SpinMutex::new(console),
        }
    }
}

impl<T: Send> ErrorType for &SharedConsole<T> {
    type Error = Infallible;
}

impl<T: Send + ErrorType<Error = Infallible> + Write> Write for &SharedConsole<T> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.console.lock().write(buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.console.lock().flush()
    }
}

impl<T: Send + ErrorType<Error = Infallible> + Read> Read for &SharedConsole<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.console.lock().read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        drivers::uart::{PolledUart, UartConfig, UartRegisters},
        fake::FakeUart,
    };

    #[test]
    fn writes_and_reads_through_port() {
        let fake = FakeUart::new(32);
        let uart = PolledUart::init(
            UartRegisters::new(fake.clone()),
            &UartConfig {
                clock_freq: 20_000_000,
                baud_rate: 115_200,
            },
        )
        .unwrap();
        let console = SharedConsole::new(uart);

        (&console).write_all(b"$ ").unwrap();
        fake.receive(b"y");
        let mut c = [0];
        (&console).read_exact(&mut c).unwrap();

        assert_eq!(fake.model().tx_fifo, [b'$', b' ']);
        assert_eq!(c, [b'y']);
    }
}

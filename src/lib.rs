// Copyright 2025 Google LLC.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

//! Interrupt controller and UART drivers for the BEAR RISC-V SoC.
//!
//! The platform-level interrupt controller multiplexes every peripheral source onto the core's
//! single machine external interrupt line, using a claim/complete handshake. The UART driver can
//! run polled, or interrupt-driven with a per-port callback registered through the controller.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod console;
pub mod drivers;
mod error;
pub mod gate;
pub mod interrupts;
pub mod logger;
pub mod mmio;
pub mod platform;

#[cfg(test)]
mod fake;

pub use error::Error;

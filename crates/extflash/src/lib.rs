//! External QSPI-NOR flash support for the Ember H750 boot chain.
//!
//! One crate, three consumers: the bootloader (bring-up, validation read
//! path, memory-mapped entry), the STM32CubeProgrammer external-loader
//! plugin (program/erase/verify), and the application image (runtime
//! config/log storage behind the shared façade).
//!
//! # Architecture layers
//!
//! ```text
//! bootloader / loader / application
//!         ↓
//! FlashUtil  — erase-before-write, verified erase, stats   (util)
//!         ↓
//! NorDriver  — W25Q256JV command protocol                  (driver)
//!         ↓
//! QspiTransport — command/read/write/poll/XiP              (transport)
//!         ↓
//! HwTransport (QUADSPI) · SimFlash (host tests)            (hw / sim)
//! ```
//!
//! Every layer above the transport is hardware-free and runs under plain
//! `cargo test` against the [`sim::SimFlash`] device model.
//!
//! # Features
//!
//! - `sim`: compile the simulated device for dependent crates' host tests
//! - `hardware`: the physical QUADSPI transport (embassy-stm32 + PAC)
//! - `defmt`: `defmt::Format` derives on public types

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
// Pedantic lints suppressed for this driver crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::missing_panics_doc)] // statically-valid expect() with safety comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod commands;
pub mod device;
pub mod driver;
pub mod partitions;
pub mod shared;
pub mod transport;
pub mod util;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

#[cfg(feature = "hardware")]
pub mod hw;

pub use device::{DeviceType, FlashDevice, JEDEC_ID_W25Q256JV, W25Q256JV};
pub use driver::{FlashError, NorDriver};
pub use partitions::{Partition, PARTITIONS};
pub use shared::SharedFlash;
pub use transport::{Command, QspiTransport, TransportError, Width};
pub use util::{FlashStats, FlashUtil, UtilError};

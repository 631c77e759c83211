//! Platform support for the Ember H750 boot chain.
//!
//! Pure hardware math and configuration: memory-map constants, QUADSPI
//! geometry, SDRAM timing and the JEDEC init sequence, MPU register values,
//! and the clock-requirement table. Nothing in this crate touches a
//! register — every function is host-testable — and the hardware shims in
//! the bin crates consume the computed values.
//!
//! # Architecture layers
//!
//! ```text
//! bin targets (bootloader, loader, firmware)
//!         ↓
//! extflash (NOR driver + utility)
//!         ↓
//! platform (this crate — constants + pure math)
//! ```

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
// Pedantic lints suppressed for this hardware-constants crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::missing_panics_doc)] // statically-valid expect() with safety comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod clock_config;
pub mod memory_map;
pub mod mpu;
pub mod qspi_config;
pub mod sdram;

pub use mpu::{MpuApplier, MpuAttributes, MpuError, MpuRegion};
pub use sdram::{SdramCommand, SdramInitSequence, SdramTiming, SdramTimingNs};

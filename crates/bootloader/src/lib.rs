//! Ember H750 stage-1 bootloader.
//!
//! Validates the application image resident in memory-mapped external flash
//! and performs the non-returning handoff. The state machine through the
//! jump/halt decision is pure and host-tested ([`handoff`], [`image`]);
//! the MPU/cache bring-up and the jump itself are the only hardware-bound
//! pieces ([`hardware`], `hardware` feature).

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod handoff;
pub mod image;

#[cfg(feature = "hardware")]
pub mod hardware;

pub use handoff::{boot_to_decision, BootDecision, BootFault, BootStage};
pub use image::{validate, AppImageHeader, BootConfig, ValidateError, ValidatedImage};

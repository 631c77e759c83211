//! Ember H750 application image.
//!
//! Executed from memory-mapped QSPI flash after the bootloader's handoff.
//! The one thing this crate must get right before anything else runs is the
//! SDRAM relocation: [`relocate`] copies `.sdram_text`/`.sdram_rodata` from
//! their flash load addresses to SDRAM with the cache-maintenance ordering
//! instruction fetch depends on. Everything order-sensitive is encoded as
//! data and host-tested; the PAC executors ([`sdram_init`], [`dma_copy`],
//! [`cache`]) are hardware-feature-gated shims.
//!
//! # Features
//!
//! - `hardware` — STM32H750 target (embassy, PAC executors, `main.rs` bin)
//! - `std` — host tests

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod boot;
pub mod exception_handlers;
pub mod relocate;

#[cfg(feature = "hardware")]
pub mod cache;
#[cfg(feature = "hardware")]
pub mod dma_copy;
#[cfg(feature = "hardware")]
pub mod sdram_init;

pub use relocate::{
    relocate_sections, CacheOps, CopyError, DmaCopier, RelocateError, SectionDesc, BURST_ALIGN,
    COPY_CHUNK,
};

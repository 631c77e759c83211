//! STM32CubeProgrammer external-loader plugin for the Ember H750 board.
//!
//! A separate build target that links only the NOR driver and transport:
//! the host tool loads the resulting ELF into target RAM and drives the
//! fixed `Init`/`Write`/`Read`/`SectorErase`/`MassErase`/`Verify`/`CheckSum`
//! entry points to program the external W25Q256JV.
//!
//! Three pieces:
//!
//! - [`dev_info`] — the device-descriptor blob the tool parses out of the
//!   ELF (explicit byte layout, `.dev_info` section).
//! - [`adapter`] — transport-generic entry-point logic, host-tested against
//!   the simulated device.
//! - [`abi`] — the `extern "C"` shims + hardware bring-up (`hardware`
//!   feature only).

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

pub mod adapter;
pub mod dev_info;

#[cfg(feature = "hardware")]
pub mod abi;

#[cfg(feature = "hardware")]
use defmt_rtt as _;
#[cfg(feature = "hardware")]
use panic_probe as _;

// The host build still produces the `staticlib` artifact, which (unlike the
// `lib` rlib) requires a `#[panic_handler]` at link time. On hardware the
// handler comes from `panic-probe`; without the `hardware` feature there is
// none, so provide a trivial one. This host artifact is never executed — the
// shippable plugin is the thumbv7em `hardware` build.
#[cfg(all(not(test), not(feature = "hardware")))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

pub use adapter::{LoaderCore, FAILURE, SUCCESS, VERIFY_ERROR_TAG};
pub use dev_info::{build_descriptor, SectorType, DESCRIPTOR_LEN};

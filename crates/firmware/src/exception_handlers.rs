//! Cortex-M exception handlers for the application image.
//!
//! HardFault is the catch-all for memory access violations (MPU fault, bus
//! fault on a dead FMC/QSPI access), illegal instructions (a bad relocation
//! that slipped past the abort path), and stack overflows.
//!
//! # Hardware-only handler
//!
//! The `#[cortex_m_rt::exception]` attribute requires ARM target intrinsics
//! and is gated behind `#[cfg(feature = "hardware")]`. The module itself
//! (and `HARDFAULT_DEFINED`) compiles unconditionally so host tests can
//! verify the module exists without an ARM toolchain.

/// Marker constant — checked by tests to verify this module is compiled in.
pub const HARDFAULT_DEFINED: bool = true;

/// HardFault exception handler (hardware target only).
///
/// Outputs the exception frame address via defmt/RTT so the stacked PC, LR,
/// and PSR can be inspected, then halts. Returning from a HardFault handler
/// is undefined behavior on Cortex-M; the `-> !` type enforces the halt.
#[cfg(feature = "hardware")]
#[cortex_m_rt::exception]
#[allow(unsafe_code)]
unsafe fn HardFault(ef: &cortex_m_rt::ExceptionFrame) -> ! {
    defmt::panic!(
        "HardFault! Stacked exception frame at 0x{:08X}. \
         Check the stacked PC: a fault in the 0xC000_0000 range points at \
         relocated code, 0x9000_0000 at the XiP window.",
        ef as *const _ as u32
    );
}

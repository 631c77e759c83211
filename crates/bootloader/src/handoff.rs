//! Bootloader handoff state machine.
//!
//! `Init → FlashBringup → MemoryMapped → Validate → {Jump | Halt}`
//!
//! Everything up to and including validation is pure and host-testable:
//! [`boot_to_decision`] drives the flash driver through bring-up and mode
//! entry and returns a [`BootDecision`] sum type. Only the final
//! irreversible branch — [`crate::hardware::jump`] — touches the platform
//! primitive, and nothing after `Jump` begins can return to bootloader
//! state: VTOR relocation is one-way by construction.

use extflash::{FlashError, NorDriver, QspiTransport};

use crate::image::{validate, AppImageHeader, BootConfig, ValidatedImage};

/// The stages the state machine passes through, in order. Reported to the
/// observer callback for diagnostics and asserted in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootStage {
    /// Peripheral/clock bring-up (delegated to the BSP, observed only).
    Init,
    /// NOR driver reset + JEDEC identification.
    FlashBringup,
    /// Memory-mapped read mode entry.
    MemoryMapped,
    /// Header fetch + range validation.
    Validate,
}

/// Why the boot halted. Each variant wraps the failing sub-step's own error
/// type — no raw integers crossing layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootFault {
    /// NOR bring-up or identification failed.
    FlashBringup(FlashError),
    /// Could not enter memory-mapped mode.
    MemoryMapped(FlashError),
    /// The image header failed validation.
    Validate(crate::image::ValidateError),
}

/// Terminal outcome of the pre-jump state machine.
///
/// `Jump` carries the validated image for the platform jump primitive;
/// `Halt` is by design unrecoverable — a bad image must not be allowed to
/// partially execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootDecision {
    /// Hand off to the validated application image.
    Jump(ValidatedImage),
    /// Stay in the bootloader's halt loop, with the diagnosed fault.
    Halt(BootFault),
}

/// Run the state machine up to the jump/halt decision.
///
/// `fetch_header` reads the two header words once the flash is
/// memory-mapped: on hardware, volatile reads of `0x9000_0000`; in tests,
/// a closure over the simulated device's contents. `observer` is called on
/// each stage entry (wire defmt logging or a test recorder into it).
pub fn boot_to_decision<T: QspiTransport>(
    driver: &mut NorDriver<T>,
    cfg: &BootConfig,
    fetch_header: impl FnOnce() -> AppImageHeader,
    mut observer: impl FnMut(BootStage),
) -> BootDecision {
    observer(BootStage::Init);

    observer(BootStage::FlashBringup);
    if let Err(e) = driver.init() {
        return BootDecision::Halt(BootFault::FlashBringup(e));
    }

    observer(BootStage::MemoryMapped);
    if let Err(e) = driver.memory_mapped_mode() {
        return BootDecision::Halt(BootFault::MemoryMapped(e));
    }

    observer(BootStage::Validate);
    match validate(fetch_header(), cfg) {
        Ok(image) => BootDecision::Jump(image),
        Err(e) => BootDecision::Halt(BootFault::Validate(e)),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

//! Clock configuration requirements for the STM32H750 boot chain.
//!
//! Encodes which peripherals need which clock sources, enabling compile-time
//! documentation and runtime validation of clock setup order. The STM32H7
//! clock tree has several silent-failure orderings (a peripheral whose
//! kernel clock is not running simply hangs, with no error code), so the
//! requirements live in one table that tests and boot code both read.

/// Clock sources relevant to the boot chain on the STM32H750.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    /// PLL2 R output — kernel clock for FMC (SDRAM) and QUADSPI (NOR XiP).
    ///
    /// Target 200 MHz: FMC_CLK = PLL2R / 2 = 100 MHz to the W9825G6KH-6,
    /// QUADSPI = PLL2R / (prescaler + 1) = 100 MHz to the W25Q256JV.
    Pll2R,
    /// 32 kHz LSI oscillator — the IWDG watchdog's only clock source.
    /// Always available; cannot be gated once the watchdog is unleashed.
    Lsi,
    /// AHB bus clock — DMA controllers and the MDMA relocation engine.
    Ahb,
}

/// A peripheral and its mandatory clock-source dependency.
///
/// Static documentation + runtime-assertion records. They do **not**
/// configure hardware — they verify the documented requirement is present
/// in the table and (on hardware) assert it at boot.
pub struct ClockRequirement {
    /// Short identifier for the peripheral (e.g. `"QUADSPI"`).
    pub peripheral: &'static str,
    /// The clock source that must be active before this peripheral is init'd.
    pub required_source: ClockSource,
    /// Why this requirement exists, with the failure mode when violated.
    pub note: &'static str,
}

/// All clock requirements for the Ember boot chain on STM32H750.
///
/// Single source of truth for "which clock must be enabled before which
/// peripheral"; checked by tests and read at boot to validate RCC config.
pub const BOOT_CLOCK_REQUIREMENTS: &[ClockRequirement] = &[
    ClockRequirement {
        peripheral: "QUADSPI",
        required_source: ClockSource::Pll2R,
        note: "QUADSPI kernel clock defaults to rcc_hclk3 but we mux it to PLL2R for a \
               stable 200 MHz regardless of AHB scaling; transactions hang (BUSY never \
               clears) if the selected kernel clock is not running",
    },
    ClockRequirement {
        peripheral: "FMC",
        required_source: ClockSource::Pll2R,
        note: "FMC_CLK = PLL2R/2 = 100 MHz to the SDRAM; the JEDEC init sequence times \
               out against a dead kernel clock and the relocation loader aborts the boot",
    },
    ClockRequirement {
        peripheral: "MDMA",
        required_source: ClockSource::Ahb,
        note: "the relocation loader's copy engine; AHB-clocked, enabled via RCC AHB3ENR \
               before the first chunk transfer is started",
    },
    ClockRequirement {
        peripheral: "IWDG1",
        required_source: ClockSource::Lsi,
        note: "the application heartbeat watchdog; LSI is free-running so there is no \
               ordering hazard, but the bootloader must NOT unleash it — a halted \
               bootloader has to stay halted for field diagnosis, not reset-loop",
    },
];

/// Set to `true` when the firmware `Cargo.toml` uses an explicit
/// `time-driver-tim*` feature rather than the catch-all `time-driver-any`.
///
/// Documentation assertion enforced by architecture tests: the actual
/// feature used is `time-driver-tim2`.
pub const TIME_DRIVER_EXPLICIT: bool = true;

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadspi_requires_pll2r() {
        let req = BOOT_CLOCK_REQUIREMENTS
            .iter()
            .find(|r| r.peripheral == "QUADSPI");
        assert!(
            matches!(
                req,
                Some(ClockRequirement {
                    required_source: ClockSource::Pll2R,
                    ..
                })
            ),
            "QUADSPI must have a documented PLL2R requirement"
        );
    }

    #[test]
    fn test_fmc_requires_pll2r() {
        let req = BOOT_CLOCK_REQUIREMENTS.iter().find(|r| r.peripheral == "FMC");
        assert!(matches!(
            req,
            Some(ClockRequirement {
                required_source: ClockSource::Pll2R,
                ..
            })
        ));
    }

    /// The watchdog note carries the bootloader-must-not-arm policy; the
    /// bootloader crate's tests cross-check against this string.
    #[test]
    fn test_iwdg_note_forbids_bootloader_arming() {
        let req = BOOT_CLOCK_REQUIREMENTS
            .iter()
            .find(|r| r.peripheral == "IWDG1")
            .map(|r| r.note);
        assert!(req.is_some_and(|n| n.contains("must NOT unleash")));
    }
}

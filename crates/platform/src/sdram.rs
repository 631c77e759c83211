//! FMC SDRAM timing and initialization sequence for W9825G6KH-6.
//!
//! The application image keeps its hot `.text`/`.rodata` in SDRAM (copied
//! there by the relocation loader before use), so SDRAM bring-up is a boot
//! prerequisite, not an optional feature.
//!
//! # Hardware
//!
//! **SDRAM chip:** W9825G6KH-6 (Winbond) — 32 MB (16M × 16-bit), TSOP-54,
//! mapped at `0xC000_0000` via FMC bank 5/6. Run at 100 MHz FMC clock
//! (FMC kernel = PLL2R 200 MHz, FMC_CLK = kernel / 2).
//!
//! # Initialization sequence
//!
//! The JEDEC power-up sequence is a fixed command order mandated by the
//! device (datasheet §8.1, RM0433 §23.9.3); it is **not reorderable**:
//!
//! 1. Clock configuration enable (`FMC_SDCMR MODE=001`), then ≥ 100 µs wait
//! 2. Precharge-all (`MODE=010`)
//! 3. Auto-refresh burst, 2 cycles minimum (`MODE=011`, NRFS=2)
//! 4. Load mode register (`MODE=100`, MRD=0x0230: CL=3, burst length 1,
//!    single-location write)
//! 5. Program the refresh-rate timer (`FMC_SDRTR COUNT=761`)
//!
//! [`SdramInitSequence`] encodes this order as pure data so host tests can
//! assert it; the FMC executor in the firmware crate replays it against the
//! `FMC_SDCMR`/`FMC_SDRTR` registers.
//!
//! # Timing sources
//!
//! W9825G6KH-6 datasheet (-6 speed grade, 166 MHz capable): tRC=60 ns,
//! tRAS=42 ns, tRCD=tRP=15 ns, tXSR=70 ns, tWR/tMRD=2 CLK min,
//! tREF = 4096 rows / 64 ms.

/// SDRAM timing parameters in nanoseconds (from the datasheet).
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SdramTimingNs {
    /// tMRD — Load Mode Register to Activate (ns). 2 CLK cycles min.
    pub t_mrd_ns: u32,
    /// tXSR — Exit Self-Refresh to Activate (ns).
    pub t_xsr_ns: u32,
    /// tRAS — Row Active time (ns).
    pub t_ras_ns: u32,
    /// tRC — Row Cycle time: ACTIVATE to ACTIVATE, same bank (ns).
    pub t_rc_ns: u32,
    /// tWR — Write Recovery time (ns). 2 CLK cycles min.
    pub t_wr_ns: u32,
    /// tRP — Row Precharge time (ns).
    pub t_rp_ns: u32,
    /// tRCD — Row to Column Delay (ns).
    pub t_rcd_ns: u32,
}

/// SDRAM timing validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SdramTimingError {
    /// A timing value the FMC requires to be non-zero was zero.
    /// The `field` string names the offending parameter (e.g. `"t_rp"`).
    TooSmall {
        /// Name of the timing field that was zero.
        field: &'static str,
    },
}

/// SDRAM timing converted to FMC clock cycles, ready for `FMC_SDTR` encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SdramTiming {
    /// tMRD in cycles (≥ 2 CLK).
    pub load_to_active_delay: u32,
    /// tXSR in cycles.
    pub exit_self_refresh_delay: u32,
    /// tRAS in cycles.
    pub self_refresh_time: u32,
    /// tRC in cycles.
    pub row_cycle_delay: u32,
    /// tWR in cycles (≥ 2 CLK).
    pub write_recovery_time: u32,
    /// tRP in cycles.
    pub rp_delay: u32,
    /// tRCD in cycles.
    pub rc_delay: u32,
}

impl SdramTiming {
    /// Convert nanoseconds to FMC clock cycles (ceiling division, min 1).
    ///
    /// Formula: `cycles = ceil(ns * fmc_hz / 1_000_000_000)` in integer
    /// arithmetic (no floating point in `no_std`).
    #[allow(clippy::cast_possible_truncation)] // cycles fits u32 for any sane ns/Hz pair
    pub fn ns_to_cycles(ns: u32, fmc_hz: u32) -> u32 {
        let numer = u64::from(ns) * u64::from(fmc_hz);
        let cycles = (numer + 999_999_999) / 1_000_000_000;
        cycles.max(1) as u32
    }

    /// Create timing from nanosecond specs, converting to cycles at `fmc_hz`.
    ///
    /// Returns `Err` for explicitly-zero inputs on fields the FMC requires
    /// to be at least one cycle (`ns_to_cycles` clamps to ≥ 1, which would
    /// otherwise mask the caller's error).
    pub fn new(ns: SdramTimingNs, fmc_hz: u32) -> Result<Self, SdramTimingError> {
        for (value, field) in [
            (ns.t_rp_ns, "t_rp"),
            (ns.t_rcd_ns, "t_rcd"),
            (ns.t_rc_ns, "t_rc"),
            (ns.t_ras_ns, "t_ras"),
            (ns.t_xsr_ns, "t_xsr"),
        ] {
            if value == 0 {
                return Err(SdramTimingError::TooSmall { field });
            }
        }

        Ok(Self {
            // tMRD and tWR are CLK-based minimums in the datasheet; take the
            // larger of the ns conversion and the 2-cycle floor.
            load_to_active_delay: Self::ns_to_cycles(ns.t_mrd_ns, fmc_hz).max(2),
            exit_self_refresh_delay: Self::ns_to_cycles(ns.t_xsr_ns, fmc_hz),
            self_refresh_time: Self::ns_to_cycles(ns.t_ras_ns, fmc_hz),
            row_cycle_delay: Self::ns_to_cycles(ns.t_rc_ns, fmc_hz),
            write_recovery_time: Self::ns_to_cycles(ns.t_wr_ns, fmc_hz).max(2),
            rp_delay: Self::ns_to_cycles(ns.t_rp_ns, fmc_hz),
            rc_delay: Self::ns_to_cycles(ns.t_rcd_ns, fmc_hz),
        })
    }

    /// Pre-computed W9825G6KH-6 timing at 100 MHz FMC clock (10 ns period).
    ///
    /// Resulting cycle counts: tMRD=2, tXSR=7, tRAS=5, tRC=6, tWR=2,
    /// tRP=2, tRCD=2.
    pub fn w9825g6kh6_at_100mhz() -> Self {
        #[allow(clippy::expect_used)] // statically valid datasheet values
        let timing = Self::new(
            SdramTimingNs {
                t_mrd_ns: 20, // 2 CLK @ 100 MHz
                t_xsr_ns: 70,
                t_ras_ns: 42,
                t_rc_ns: 60,
                t_wr_ns: 20, // 2 CLK @ 100 MHz
                t_rp_ns: 15,
                t_rcd_ns: 15,
            },
            100_000_000,
        )
        .expect("W9825G6KH-6 timing values are statically valid at 100 MHz");
        timing
    }
}

// ── Mode register and refresh rate ───────────────────────────────────────────

/// W9825G6KH-6 mode-register value loaded during initialization.
///
/// | Field            | Bits  | Value | Meaning                   |
/// |------------------|-------|-------|---------------------------|
/// | Burst length     | 2:0   | 000   | 1 (no burst)              |
/// | Burst type       | 3     | 0     | sequential                |
/// | CAS latency      | 6:4   | 011   | 3 (required at 100 MHz)   |
/// | Operating mode   | 8:7   | 00    | standard                  |
/// | Write burst mode | 9     | 1     | single-location write     |
///
/// Combined: `0x0230`.
pub const W9825G6KH6_MODE_REGISTER: u16 = 0x0230;

/// Auto-refresh counter value for `FMC_SDRTR` at 100 MHz (computed: 761).
pub const W9825G6KH6_REFRESH_COUNT: u32 = sdram_refresh_count(100_000_000, 8192, 64);

/// Compute the `FMC_SDRTR.COUNT` value.
///
/// Formula (RM0433 §23.9.3): `count = (fmc_hz * refresh_ms) / (rows * 1000) - 20`,
/// the −20 being the safety margin ST mandates for back-to-back refreshes.
#[allow(clippy::cast_possible_truncation)] // result is < 2^13 for any real SDRAM
pub const fn sdram_refresh_count(fmc_hz: u32, rows: u32, refresh_ms: u32) -> u32 {
    let period = (fmc_hz as u64 * refresh_ms as u64) / (rows as u64 * 1000);
    (period as u32).saturating_sub(20)
}

// ── Initialization command sequence ──────────────────────────────────────────

/// One step of the JEDEC SDRAM power-up sequence.
///
/// Pure data: the FMC executor in the firmware crate maps each variant onto
/// an `FMC_SDCMR`/`FMC_SDRTR` register write; host tests assert the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SdramCommand {
    /// Clock configuration enable (`MODE=001`), followed by the mandatory
    /// power-up wait in microseconds before the next command may be issued.
    ClockEnable {
        /// Post-command settling delay (W9825G6KH-6: ≥ 100 µs).
        delay_us: u32,
    },
    /// Precharge-all banks (`MODE=010`).
    PrechargeAll,
    /// Auto-refresh burst (`MODE=011`).
    AutoRefresh {
        /// Number of consecutive auto-refresh cycles (NRFS field).
        count: u8,
    },
    /// Load mode register (`MODE=100`).
    LoadModeRegister {
        /// Value driven on the address bus (MRD field).
        value: u16,
    },
    /// Program the refresh-rate timer (`FMC_SDRTR`).
    SetRefreshRate {
        /// COUNT field value.
        count: u32,
    },
}

/// The full, ordered init sequence for one SDRAM device.
#[derive(Debug, Clone, Copy)]
pub struct SdramInitSequence {
    steps: [SdramCommand; 5],
}

impl SdramInitSequence {
    /// Power-up sequence for the W9825G6KH-6 at 100 MHz.
    #[must_use]
    pub const fn w9825g6kh6() -> Self {
        Self {
            steps: [
                SdramCommand::ClockEnable { delay_us: 100 },
                SdramCommand::PrechargeAll,
                SdramCommand::AutoRefresh { count: 2 },
                SdramCommand::LoadModeRegister {
                    value: W9825G6KH6_MODE_REGISTER,
                },
                SdramCommand::SetRefreshRate {
                    count: W9825G6KH6_REFRESH_COUNT,
                },
            ],
        }
    }

    /// The ordered command steps.
    #[must_use]
    pub fn steps(&self) -> &[SdramCommand] {
        &self.steps
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify W9825G6KH-6 pre-computed timing values at 100 MHz FMC clock.
    #[test]
    fn test_w9825g6kh6_timing_values_at_100mhz() {
        let timing = SdramTiming::w9825g6kh6_at_100mhz();
        assert_eq!(timing.load_to_active_delay, 2);
        assert_eq!(timing.exit_self_refresh_delay, 7);
        assert_eq!(timing.self_refresh_time, 5);
        assert_eq!(timing.row_cycle_delay, 6);
        assert_eq!(timing.write_recovery_time, 2);
        assert_eq!(timing.rp_delay, 2);
        assert_eq!(timing.rc_delay, 2);
    }

    /// Nanosecond-to-cycle ceiling conversion at 100 MHz (10 ns period).
    #[test]
    fn test_timing_ns_to_cycles_conversion() {
        assert_eq!(SdramTiming::ns_to_cycles(42, 100_000_000), 5);
        assert_eq!(SdramTiming::ns_to_cycles(15, 100_000_000), 2);
        assert_eq!(SdramTiming::ns_to_cycles(70, 100_000_000), 7);
        assert_eq!(SdramTiming::ns_to_cycles(1, 100_000_000), 1); // min 1 cycle
    }

    /// FMC requires all timing values >= 1 cycle; zero-ns tRP must be rejected.
    #[test]
    fn test_timing_validates_fmc_minimums() {
        let result = SdramTiming::new(
            SdramTimingNs {
                t_mrd_ns: 10,
                t_xsr_ns: 70,
                t_ras_ns: 42,
                t_rc_ns: 60,
                t_wr_ns: 20,
                t_rp_ns: 0, // INVALID — must be rejected
                t_rcd_ns: 15,
            },
            100_000_000,
        );
        assert_eq!(result, Err(SdramTimingError::TooSmall { field: "t_rp" }));
    }

    /// Refresh count formula at 100 MHz / 8192 rows / 64 ms must give 761.
    #[test]
    fn test_refresh_count_formula() {
        assert_eq!(sdram_refresh_count(100_000_000, 8192, 64), 761);
        assert_eq!(W9825G6KH6_REFRESH_COUNT, 761);
    }

    /// The init sequence order is the JEDEC-mandated one and is not
    /// reorderable: clock enable, precharge-all, auto-refresh, LMR, refresh
    /// rate. The executor replays this array verbatim.
    #[test]
    fn test_init_sequence_order() {
        let seq = SdramInitSequence::w9825g6kh6();
        let steps = seq.steps();
        assert_eq!(steps.len(), 5);
        assert!(matches!(
            steps[0],
            SdramCommand::ClockEnable { delay_us: 100 }
        ));
        assert!(matches!(steps[1], SdramCommand::PrechargeAll));
        assert!(matches!(steps[2], SdramCommand::AutoRefresh { count: 2 }));
        assert!(matches!(
            steps[3],
            SdramCommand::LoadModeRegister { value: 0x0230 }
        ));
        assert!(matches!(
            steps[4],
            SdramCommand::SetRefreshRate { count: 761 }
        ));
    }
}

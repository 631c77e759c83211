//! Application boot sequence for the Ember H750.
//!
//! The bootloader hands over with the MPU programmed, both caches on, and
//! the QSPI window mapped; the application's own bring-up order is still
//! load-bearing:
//!
//!   1. RCC: PLL1 → 400 MHz core, PLL2R → 200 MHz FMC/QUADSPI kernel
//!   2. FMC/SDRAM: JEDEC init sequence (platform::sdram)
//!   3. Relocation: copy `.sdram_text`/`.sdram_rodata` before calling
//!      anything placed there
//!   4. IWDG: armed only after relocation succeeds — the watchdog guards a
//!      running application, while a relocation failure must halt loudly
//!   5. Embassy executor: spawn tasks
//!
//! Encoded as [`APP_BOOT_STEPS`] for tests and diagnostics, the way the
//! required ordering is pinned everywhere else in this tree.

/// Ordered list of application boot steps. Tests assert the ordering
/// constraints (SDRAM before relocation, relocation before watchdog).
pub const APP_BOOT_STEPS: &[&str] = &[
    "1. RCC: PLL1 sysclk 400 MHz, PLL2R 200 MHz for FMC + QUADSPI",
    "2. SDRAM: W9825G6KH-6 JEDEC init via FMC (clock-enable, PALL, auto-refresh x2, LMR, refresh 761)",
    "3. Relocate: DMA-copy .sdram_text/.sdram_rodata, invalidate D-cache, publish to I-cache",
    "4. IWDG: arm the 8 s heartbeat watchdog",
    "5. Executor: spawn application tasks",
];

/// IWDG timeout. The main loop must pet the watchdog at least this often;
/// it ticks at 1 Hz, leaving 8x margin.
pub const WATCHDOG_TIMEOUT_MS: u32 = 8_000;

/// IWDG constructor argument (microseconds).
#[must_use]
pub fn watchdog_timeout_us() -> u32 {
    WATCHDOG_TIMEOUT_MS.saturating_mul(1_000)
}

/// Build the `embassy_stm32::Config` with the RCC settings for this board.
///
/// # Clock tree (HSI → 400 MHz core)
///
/// HSI (64 MHz) → PLL1 (prediv 4, mul 50) → PLL1_P = 400 MHz (sys)
/// AHB prescaler DIV2 → 200 MHz, APB1-4 DIV2 → 100 MHz
/// PLL2 (prediv 8, mul 100) → VCO 800 MHz, PLL2_R DIV4 → 200 MHz:
///   FMC kernel (FMC_CLK = 100 MHz to the SDRAM) and QUADSPI kernel
///   (further divided to 100 MHz by `platform::qspi_config::QSPI_PRESCALER`).
///
/// # DO NOT call `embassy_stm32::init(Default::default())`
///
/// The default config leaves PLL2 off: FMC and QUADSPI would run from
/// rcc_hclk3 at whatever the boot clock happens to be, the SDRAM refresh
/// counter would be wrong for its clock, and the first SDRAM access after
/// tREF silently returns corrupt data. Always use this function.
#[cfg(feature = "hardware")]
pub fn build_embassy_config() -> embassy_stm32::Config {
    use embassy_stm32::rcc::*;

    let mut config = embassy_stm32::Config::default();

    // ── Oscillators ─────────────────────────────────────────────────────────
    config.rcc.hsi = Some(HSIPrescaler::DIV1); // 64 MHz internal
    config.rcc.csi = true;

    // ── PLL1: system clock ───────────────────────────────────────────────────
    // HSI (64 MHz) / prediv(4) = 16 MHz → × mul(50) = 800 MHz VCO
    // PLL1_P = VCO / divp(2) = 400 MHz → system clock
    config.rcc.pll1 = Some(Pll {
        source: PllSource::HSI,
        prediv: PllPreDiv::DIV4,
        mul: PllMul::MUL50,
        divp: Some(PllDiv::DIV2), // 400 MHz — system clock
        divq: None,
        divr: None,
    });

    // ── PLL2: FMC (SDRAM) + QUADSPI kernel clock ─────────────────────────────
    // HSI (64 MHz) / prediv(8) = 8 MHz → × mul(100) = 800 MHz VCO
    // PLL2_R = VCO / divr(4) = 200 MHz → FMC / QUADSPI kernel
    // FMC_CLK output = PLL2R / 2 = 100 MHz (W9825G6KH-6 spec: 166 MHz max)
    // QUADSPI = PLL2R / (QSPI_PRESCALER + 1) = 100 MHz (W25Q256JV: 133 max)
    config.rcc.pll2 = Some(Pll {
        source: PllSource::HSI,
        prediv: PllPreDiv::DIV8,
        mul: PllMul::MUL100,
        divp: None,
        divq: None,
        divr: Some(PllDiv::DIV4), // 200 MHz — FMC + QUADSPI kernel clock
    });

    // ── System clock + bus prescalers ────────────────────────────────────────
    config.rcc.sys = Sysclk::PLL1_P; // 400 MHz
    config.rcc.ahb_pre = AHBPrescaler::DIV2; // 200 MHz
    config.rcc.apb1_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.apb2_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.apb3_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.apb4_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.voltage_scale = VoltageScale::Scale1;

    config
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_steps_order_sdram_before_relocate_before_watchdog() {
        let pos = |needle: &str| {
            APP_BOOT_STEPS
                .iter()
                .position(|s| s.contains(needle))
                .unwrap_or_else(|| panic!("missing boot step: {needle}"))
        };
        assert!(pos("SDRAM") < pos("Relocate"), "SDRAM must init before the copy");
        assert!(
            pos("Relocate") < pos("IWDG"),
            "the watchdog guards a running app, not the relocation"
        );
    }

    #[test]
    fn test_watchdog_budget_vs_heartbeat() {
        // 1 Hz heartbeat against an 8 s window.
        assert!(WATCHDOG_TIMEOUT_MS >= 8 * 1_000);
        assert_eq!(watchdog_timeout_us(), 8_000_000);
    }

    #[test]
    fn test_sdram_refresh_matches_fmc_clock() {
        // The RCC config drives FMC_CLK at 100 MHz; the refresh count baked
        // into the init sequence must be derived for the same clock.
        assert_eq!(
            platform::sdram::sdram_refresh_count(100_000_000, 8192, 64),
            platform::sdram::W9825G6KH6_REFRESH_COUNT
        );
    }
}

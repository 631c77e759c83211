//! FMC bring-up executor for the SDRAM init sequence (hardware only).
//!
//! `platform::sdram::SdramInitSequence` is pure data; this module replays
//! it against the FMC SDRAM command registers. embassy-stm32 0.1.0 has no
//! SDRAM API, so configuration and commands go through the PAC directly
//! (RM0433 §23.9: FMC_SDCR/SDTR for configuration, FMC_SDCMR for the
//! command FIFO, FMC_SDRTR for the refresh timer).
//!
//! Failure here aborts the whole boot — logged, not retried. The relocation
//! loader cannot run against an uninitialized destination.

use embassy_stm32::pac;
use embassy_time::{block_for, Duration, Instant};
use platform::sdram::{SdramCommand, SdramInitSequence, SdramTiming};

/// Busy-wait ceiling for each FMC command to drain (SDSR.BUSY).
const COMMAND_TIMEOUT_MS: u64 = 10;

/// SDRAM bring-up failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum SdramInitError {
    /// The FMC never finished issuing a command (SDSR.BUSY stuck).
    Timeout {
        /// Index of the stuck step within the init sequence.
        step: usize,
    },
}

/// FMC_SDCMR MODE field values (RM0433 Table 175).
mod mode {
    pub const CLOCK_ENABLE: u8 = 0b001;
    pub const PALL: u8 = 0b010;
    pub const AUTO_REFRESH: u8 = 0b011;
    pub const LOAD_MODE_REGISTER: u8 = 0b100;
}

fn wait_not_busy(step: usize) -> Result<(), SdramInitError> {
    let deadline = Instant::now() + Duration::from_millis(COMMAND_TIMEOUT_MS);
    while pac::FMC.sdsr().read().busy() {
        if Instant::now() > deadline {
            return Err(SdramInitError::Timeout { step });
        }
    }
    Ok(())
}

fn issue(step: usize, mode_bits: u8, nrfs: u8, mrd: u16) -> Result<(), SdramInitError> {
    pac::FMC.sdcmr().write(|w| {
        w.set_mode(mode_bits);
        w.set_ctb1(true); // bank 1 (SDNE0) — the only bank populated
        w.set_ctb2(false);
        w.set_nrfs(nrfs);
        w.set_mrd(mrd);
    });
    wait_not_busy(step)
}

/// Program the FMC SDRAM configuration and run the JEDEC init sequence.
///
/// Caller guarantees PLL2R is running (FMC kernel clock) and the FMC GPIO
/// bank is muxed — both are part of `build_embassy_config()` + board init.
pub fn init_sdram(timing: &SdramTiming, sequence: &SdramInitSequence) -> Result<(), SdramInitError> {
    // ── Configuration: geometry + CAS latency (FMC_SDCR1) ────────────────────
    // W9825G6KH-6: 9 column bits, 13 row bits, 16-bit bus, 4 banks, CL=3,
    // SDCLK = kernel/2, read burst on, no read pipe delay.
    pac::FMC.sdcr(0).write(|w| {
        w.set_nc(1); // 9 column bits (8 + NC)
        w.set_nr(2); // 13 row bits (11 + NR)
        w.set_mwid(1); // 16-bit data bus
        w.set_nb(true); // 4 internal banks
        w.set_cas(3);
        w.set_sdclk(2); // FMC_CLK = kernel / 2 = 100 MHz
        w.set_rburst(true);
        w.set_rpipe(0);
    });

    // ── Timing (FMC_SDTR1): fields are cycles − 1 ───────────────────────────
    #[allow(clippy::cast_possible_truncation)] // all cycle counts ≤ 16
    pac::FMC.sdtr(0).write(|w| {
        w.set_tmrd((timing.load_to_active_delay - 1) as u8);
        w.set_txsr((timing.exit_self_refresh_delay - 1) as u8);
        w.set_tras((timing.self_refresh_time - 1) as u8);
        w.set_trc((timing.row_cycle_delay - 1) as u8);
        w.set_twr((timing.write_recovery_time - 1) as u8);
        w.set_trp((timing.rp_delay - 1) as u8);
        w.set_trcd((timing.rc_delay - 1) as u8);
    });

    // ── JEDEC power-up command sequence, in data-mandated order ─────────────
    for (step, command) in sequence.steps().iter().enumerate() {
        match *command {
            SdramCommand::ClockEnable { delay_us } => {
                issue(step, mode::CLOCK_ENABLE, 1, 0)?;
                block_for(Duration::from_micros(u64::from(delay_us)));
            }
            SdramCommand::PrechargeAll => issue(step, mode::PALL, 1, 0)?,
            SdramCommand::AutoRefresh { count } => {
                issue(step, mode::AUTO_REFRESH, count, 0)?;
            }
            SdramCommand::LoadModeRegister { value } => {
                issue(step, mode::LOAD_MODE_REGISTER, 1, value)?;
            }
            SdramCommand::SetRefreshRate { count } => {
                #[allow(clippy::cast_possible_truncation)] // COUNT is a 13-bit field
                pac::FMC.sdrtr().write(|w| w.set_count(count as u16));
                wait_not_busy(step)?;
            }
        }
    }

    Ok(())
}

//! MDMA-backed [`DmaCopier`] (hardware only).
//!
//! The MDMA sits on the 64-bit AXI matrix and is the one DMA engine that
//! reaches both the QSPI memory-mapped window and the FMC SDRAM bank, which
//! makes it the relocation loader's copy engine. Channel 0 is claimed for
//! the whole boot; nothing else runs this early.
//!
//! embassy-stm32 0.1.0 exposes MDMA only as an interrupt-driven peripheral
//! helper, so block transfers are programmed through the PAC (RM0433 §26):
//! software-request block transfers, 32-byte source/destination bursts,
//! completion polled on CISR.BTIF with a fixed per-chunk deadline.

use embassy_stm32::pac;
use embassy_time::{Duration, Instant};

use crate::relocate::{CopyError, DmaCopier};

/// Per-chunk completion deadline. A 16 KiB AXI-to-FMC block lands in tens
/// of microseconds; 10 ms flags a wedged bus, not a slow one.
const CHUNK_TIMEOUT_MS: u64 = 10;

/// MDMA channel 0 block-copy engine.
pub struct MdmaCopier {
    _private: (),
}

impl MdmaCopier {
    /// Claim MDMA channel 0. Enables the MDMA AHB clock.
    ///
    /// Call once, before the relocation pass; constructing a second copier
    /// while a transfer is in flight corrupts the transfer.
    #[must_use]
    pub fn new() -> Self {
        pac::RCC.ahb3enr().modify(|w| w.set_mdmaen(true));
        Self { _private: () }
    }
}

impl Default for MdmaCopier {
    fn default() -> Self {
        Self::new()
    }
}

impl DmaCopier for MdmaCopier {
    fn copy(&mut self, src: u32, dst: u32, len: u32) -> Result<(), CopyError> {
        let ch = pac::MDMA.ch(0);

        if ch.cr().read().en() {
            // A previous transfer never drained — treat as a start fault.
            return Err(CopyError::Start);
        }

        // Clear stale flags, then program a single software-requested block.
        ch.ifcr().write(|w| {
            w.set_cbtif(true);
            w.set_cctcif(true);
            w.set_cteif(true);
        });
        ch.tcr().write(|w| {
            w.set_sinc(0b10); // source increment
            w.set_dinc(0b10); // destination increment
            w.set_ssize(0b10); // 32-bit beats
            w.set_dsize(0b10);
            w.set_sburst(0b011); // 8-beat (32-byte) bursts
            w.set_dburst(0b011);
            w.set_tlen(31); // 32 bytes per buffer transfer
            w.set_trgm(0b01); // block transfer per request
            w.set_swrm(true); // software request
        });
        ch.bndtr().write(|w| w.set_bndt(len));
        ch.sar().write_value(src);
        ch.dar().write_value(dst);
        ch.cr().modify(|w| w.set_en(true));
        ch.cr().modify(|w| w.set_swrq(true));

        let deadline = Instant::now() + Duration::from_millis(CHUNK_TIMEOUT_MS);
        loop {
            let isr = ch.isr().read();
            if isr.teif() {
                ch.cr().modify(|w| w.set_en(false));
                return Err(CopyError::Start);
            }
            if isr.btif() {
                break;
            }
            if Instant::now() > deadline {
                ch.cr().modify(|w| w.set_en(false));
                return Err(CopyError::Timeout);
            }
        }
        ch.ifcr().write(|w| w.set_cbtif(true));
        ch.cr().modify(|w| w.set_en(false));
        Ok(())
    }
}

//! Hardware QSPI transport for the STM32H750 QUADSPI controller.
//!
//! Indirect-mode transactions go through the embassy-stm32 blocking QSPI
//! driver. Two transaction shapes embassy does not implement are done with
//! PAC-level register writes:
//!
//! - **Automatic status polling** (`FMODE=0b10`) — the controller re-issues
//!   the status read on an interval and sets SMF when the masked value
//!   matches; we bound the wait with an `embassy_time` deadline.
//! - **Memory-mapped (XiP) mode** (`FMODE=0b11`) — embassy-stm32 issue
//!   #3149: not implemented by the driver, so the CCR is programmed
//!   directly with the quad-read command shape.
//!
//! The embassy blocking calls do not surface bus faults themselves; the
//! transfer-error flag (TEF) is checked after each transaction and reported
//! as [`TransportError::Transfer`].

use embassy_stm32::mode::Blocking;
use embassy_stm32::pac;
use embassy_stm32::peripherals::QUADSPI;
use embassy_stm32::qspi::enums::{DummyCycles, QspiWidth};
use embassy_stm32::qspi::{Qspi, TransferConfig};
use embassy_time::{Duration, Instant};

use crate::transport::{Command, QspiTransport, TransportError, Width};

/// Status-poll re-issue interval in QSPI clock cycles (`QUADSPI_PIR`).
const POLL_INTERVAL_CYCLES: u16 = 16;

/// Transport over the physical QUADSPI peripheral.
pub struct HwTransport<'d> {
    qspi: Qspi<'d, QUADSPI, Blocking>,
    mapped: bool,
}

impl<'d> HwTransport<'d> {
    /// Wrap a configured blocking QSPI driver (bank 1 pins, prescaler and
    /// FSIZE already set per `platform::qspi_config`).
    pub fn new(qspi: Qspi<'d, QUADSPI, Blocking>) -> Self {
        Self {
            qspi,
            mapped: false,
        }
    }

    fn width(w: Width) -> QspiWidth {
        match w {
            Width::None => QspiWidth::NONE,
            Width::Single => QspiWidth::SING,
            Width::Quad => QspiWidth::QUAD,
        }
    }

    fn dummy(cycles: u8) -> Result<DummyCycles, TransportError> {
        match cycles {
            0 => Ok(DummyCycles::_0),
            2 => Ok(DummyCycles::_2),
            4 => Ok(DummyCycles::_4),
            6 => Ok(DummyCycles::_6),
            8 => Ok(DummyCycles::_8),
            _ => Err(TransportError::Transfer),
        }
    }

    fn transfer_config(cmd: &Command) -> Result<TransferConfig, TransportError> {
        Ok(TransferConfig {
            iwidth: QspiWidth::SING,
            awidth: Self::width(cmd.address_width),
            dwidth: Self::width(cmd.data_width),
            instruction: cmd.instruction,
            address: cmd.address,
            dummy: Self::dummy(cmd.dummy_cycles)?,
        })
    }

    /// Abort any in-flight transfer (including an open memory-mapped
    /// window) and wait for the controller to go idle. Required before an
    /// indirect transaction once XiP has been entered.
    fn abort(&mut self) {
        let r = pac::QUADSPI;
        r.cr().modify(|w| w.set_abort(true));
        while r.cr().read().abort() {}
        while r.sr().read().busy() {}
        self.mapped = false;
    }

    fn ensure_indirect(&mut self) {
        if self.mapped {
            self.abort();
        }
    }

    /// Check and clear the transfer-error flag after a transaction.
    fn check_transfer_error() -> Result<(), TransportError> {
        let r = pac::QUADSPI;
        if r.sr().read().tef() {
            r.fcr().write(|w| w.set_ctef(true));
            return Err(TransportError::Transfer);
        }
        Ok(())
    }
}

impl QspiTransport for HwTransport<'_> {
    fn command(&mut self, cmd: &Command) -> Result<(), TransportError> {
        self.ensure_indirect();
        let transaction = Self::transfer_config(cmd)?;
        self.qspi.blocking_command(transaction);
        Self::check_transfer_error()
    }

    fn read(&mut self, cmd: &Command, buf: &mut [u8]) -> Result<(), TransportError> {
        self.ensure_indirect();
        let transaction = Self::transfer_config(cmd)?;
        self.qspi.blocking_read(buf, transaction);
        Self::check_transfer_error()
    }

    fn write(&mut self, cmd: &Command, data: &[u8]) -> Result<(), TransportError> {
        self.ensure_indirect();
        let transaction = Self::transfer_config(cmd)?;
        self.qspi.blocking_write(data, transaction);
        Self::check_transfer_error()
    }

    fn poll_status(
        &mut self,
        cmd: &Command,
        mask: u8,
        value: u8,
        timeout_ms: u32,
    ) -> Result<(), TransportError> {
        self.ensure_indirect();
        let r = pac::QUADSPI;

        // Clear stale match/error flags, then arm automatic polling:
        // 1-byte status reads, stop on match (APMS).
        r.fcr().write(|w| {
            w.set_csmf(true);
            w.set_ctef(true);
        });
        r.dlr().write_value(0); // DL = 0 → 1 byte per read
        r.psmkr().write_value(u32::from(mask));
        r.psmar().write_value(u32::from(value));
        r.pir().write(|w| w.set_interval(POLL_INTERVAL_CYCLES));
        r.cr().modify(|w| w.set_apms(true));
        r.ccr().write(|w| {
            w.set_fmode(0b10); // automatic polling
            w.set_imode(0b01); // 1-line instruction
            w.set_admode(0b00); // no address
            w.set_dmode(0b01); // 1-line status data
            w.set_dcyc(0);
            w.set_instruction(cmd.instruction);
        });

        let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));
        while !r.sr().read().smf() {
            if r.sr().read().tef() {
                r.fcr().write(|w| w.set_ctef(true));
                self.abort();
                return Err(TransportError::Transfer);
            }
            if Instant::now() > deadline {
                self.abort();
                return Err(TransportError::PollTimeout);
            }
        }
        r.fcr().write(|w| w.set_csmf(true));
        Ok(())
    }

    fn memory_mapped(&mut self, read_cmd: &Command) -> Result<(), TransportError> {
        self.ensure_indirect();
        let r = pac::QUADSPI;

        // Embassy-stm32 issue #3149: XiP must be entered via the PAC. The
        // controller now generates `read_cmd` for every fetch from the
        // 0x9000_0000 window; AR auto-increments in hardware.
        r.fcr().write(|w| {
            w.set_csmf(true);
            w.set_ctef(true);
        });
        r.ccr().write(|w| {
            w.set_fmode(0b11); // memory-mapped
            w.set_imode(0b01); // 1-line instruction
            w.set_admode(0b11); // 4-line address
            w.set_adsize(0b11); // 32-bit address (4-byte mode)
            w.set_dmode(0b11); // 4-line data
            w.set_dcyc(read_cmd.dummy_cycles);
            w.set_instruction(read_cmd.instruction);
            w.set_sioo(false);
        });
        Self::check_transfer_error()?;
        self.mapped = true;
        Ok(())
    }
}

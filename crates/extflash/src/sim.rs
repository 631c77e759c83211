//! Simulated W25Q-class NOR device for host tests.
//!
//! `SimFlash` implements [`QspiTransport`] by interpreting the same command
//! stream the hardware transport would put on the bus, with the device
//! behaviors the driver's correctness depends on modeled faithfully:
//!
//! - **In-page wrap on program** — a program whose range crosses a page
//!   boundary wraps back to the page base, exactly like the real part. A
//!   buggy `write_buffer` decomposition therefore corrupts data in tests
//!   instead of passing silently.
//! - **NOR program semantics** — programming ANDs data into the array
//!   (bits only clear); only erase sets bits.
//! - **One-shot write-enable latch** — program/erase instructions without
//!   WEL set are silently ignored (the real device does the same), and WEL
//!   clears when the operation completes.
//! - **Operation journal** — every accepted instruction is recorded in
//!   order, so tests can assert sequencing ("every program preceded by its
//!   own write-enable", "exactly two sector erases at 0x1000 and 0x2000").
//!
//! Fault injection covers the failure modes the upper layers must
//! distinguish: one-shot bus transfer failure, busy-poll timeout, and a
//! post-erase stuck byte (worn cell) for the utility layer's verified erase.

use heapless::Vec;

use crate::commands;
use crate::device::{DeviceType, FlashDevice, JEDEC_ID_W25Q256JV};
use crate::transport::{Command, QspiTransport, TransportError};

/// Backing-store size used by the crate's own tests: 32 sectors, 2 blocks.
pub const SIM_SIZE: usize = 128 * 1024;

/// Descriptor matching [`SimFlash::<SIM_SIZE>`]: real W25Q geometry and
/// timing budgets, shrunk capacity.
pub const SIM_DEVICE: FlashDevice = FlashDevice {
    name: "SIMFLASH",
    device_type: DeviceType::NorFlash,
    base_address: 0x9000_0000,
    size: SIM_SIZE as u32,
    page_size: 256,
    sector_size: 4 * 1024,
    block_size: 64 * 1024,
    erase_value: 0xFF,
    jedec_id: JEDEC_ID_W25Q256JV,
    page_program_ms: 5,
    sector_erase_ms: 400,
    block_erase_ms: 2_000,
    chip_erase_ms: 120_000,
};

const PAGE: usize = 256;

/// One accepted device operation, in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimOp {
    /// Write Enable accepted; WEL latched.
    WriteEnable,
    /// Page program accepted (address and length as issued).
    Program {
        /// Issued address.
        addr: u32,
        /// Issued length in bytes.
        len: u32,
    },
    /// 4 KiB sector erase accepted.
    EraseSector {
        /// Issued (sector-base) address.
        addr: u32,
    },
    /// 64 KiB block erase accepted.
    EraseBlock {
        /// Issued (block-base) address.
        addr: u32,
    },
    /// Chip erase accepted.
    EraseChip,
    /// Reset handshake completed (enable-reset then reset-device).
    Reset,
    /// Entered 4-byte address mode.
    Enter4Byte,
    /// JEDEC ID read.
    ReadId,
    /// Data read.
    Read {
        /// Issued address.
        addr: u32,
        /// Read length in bytes.
        len: u32,
    },
    /// Entered memory-mapped mode.
    MemoryMapped,
}

/// Simulated NOR flash device + transport.
pub struct SimFlash<const SIZE: usize> {
    mem: [u8; SIZE],
    wel: bool,
    reset_enabled: bool,
    four_byte: bool,
    mapped: bool,
    jedec_id: u32,
    journal: Vec<SimOp, 256>,
    poll_log: Vec<u32, 64>,
    fail_transfer_once: bool,
    fail_poll_once: bool,
    stuck_after_erase: Option<(u32, u8)>,
}

impl<const SIZE: usize> Default for SimFlash<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SIZE: usize> SimFlash<SIZE> {
    /// Fresh device: fully erased, latch clear, 3-byte address mode.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mem: [0xFF; SIZE],
            wel: false,
            reset_enabled: false,
            four_byte: false,
            mapped: false,
            jedec_id: JEDEC_ID_W25Q256JV,
            journal: Vec::new(),
            poll_log: Vec::new(),
            fail_transfer_once: false,
            fail_poll_once: false,
            stuck_after_erase: None,
        }
    }

    /// Override the JEDEC ID the simulated part reports.
    pub fn set_jedec_id(&mut self, id: u32) {
        self.jedec_id = id;
    }

    /// Fail the next transport call with [`TransportError::Transfer`].
    pub fn fail_next_transfer(&mut self) {
        self.fail_transfer_once = true;
    }

    /// Fail the next status poll with [`TransportError::PollTimeout`].
    pub fn inject_poll_timeout(&mut self) {
        self.fail_poll_once = true;
    }

    /// After the next erase covering `offset`, leave that byte reading as
    /// `value` instead of the erase value (worn/failing cell).
    pub fn inject_erase_stuck(&mut self, offset: u32, value: u8) {
        self.stuck_after_erase = Some((offset, value));
    }

    /// The raw array contents (assert data round-trips).
    #[must_use]
    pub fn mem(&self) -> &[u8] {
        &self.mem
    }

    /// Backdoor: place bytes directly, bypassing the command protocol.
    /// Test setup only — does not journal and ignores WEL.
    pub fn fill(&mut self, offset: usize, bytes: &[u8]) {
        if let Some(dst) = self.mem.get_mut(offset..offset.saturating_add(bytes.len())) {
            dst.copy_from_slice(bytes);
        }
    }

    /// Accepted operations in arrival order.
    #[must_use]
    pub fn journal(&self) -> &[SimOp] {
        &self.journal
    }

    /// Timeout budgets passed to `poll_status`, in call order.
    #[must_use]
    pub fn poll_timeouts(&self) -> &[u32] {
        &self.poll_log
    }

    /// `true` while the simulated transport is in memory-mapped mode.
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    fn record(&mut self, op: SimOp) {
        // Journal full: the op is dropped. Tests asserting exact sequences
        // must keep their workload under the 256-entry capacity.
        let _ = self.journal.push(op);
    }

    fn take_transfer_fault(&mut self) -> Result<(), TransportError> {
        if self.fail_transfer_once {
            self.fail_transfer_once = false;
            return Err(TransportError::Transfer);
        }
        Ok(())
    }

    /// Leaving mapped mode is implicit for indirect transactions, matching
    /// the hardware transport's abort-on-demand behavior. The *driver*
    /// enforces the one-way contract; the transport stays permissive.
    fn abort_mapped(&mut self) {
        self.mapped = false;
    }

    fn erase_range(&mut self, start: usize, len: usize) {
        if let Some(range) = self.mem.get_mut(start..start.saturating_add(len)) {
            range.fill(0xFF);
        }
        if let Some((offset, value)) = self.stuck_after_erase {
            let offset = offset as usize;
            if offset >= start && offset < start.saturating_add(len) {
                if let Some(b) = self.mem.get_mut(offset) {
                    *b = value;
                }
                self.stuck_after_erase = None;
            }
        }
    }

    fn status(&self) -> u8 {
        // The simulator completes operations instantly, so BUSY never reads
        // set; WEL reflects the latch.
        if self.wel {
            commands::STATUS_WEL
        } else {
            0
        }
    }
}

// SIZE < 2^32 for every simulated part; offset math is bounds-checked via get().
#[allow(clippy::cast_possible_truncation, clippy::arithmetic_side_effects)]
impl<const SIZE: usize> QspiTransport for SimFlash<SIZE> {
    fn command(&mut self, cmd: &Command) -> Result<(), TransportError> {
        self.take_transfer_fault()?;
        self.abort_mapped();
        match (cmd.instruction, cmd.address) {
            (commands::WRITE_ENABLE, None) => {
                self.wel = true;
                self.reset_enabled = false;
                self.record(SimOp::WriteEnable);
                Ok(())
            }
            (commands::ENABLE_RESET, None) => {
                self.reset_enabled = true;
                Ok(())
            }
            (commands::RESET_DEVICE, None) => {
                if self.reset_enabled {
                    self.wel = false;
                    self.four_byte = false;
                    self.reset_enabled = false;
                    self.record(SimOp::Reset);
                }
                // Reset-device without the enable prefix is ignored, as on
                // the real part.
                Ok(())
            }
            (commands::ENTER_4BYTE_ADDRESS_MODE, None) => {
                self.four_byte = true;
                self.record(SimOp::Enter4Byte);
                Ok(())
            }
            (commands::SECTOR_ERASE_4KB, Some(addr)) => {
                if self.wel {
                    self.wel = false;
                    self.erase_range(addr as usize, SIM_DEVICE.sector_size as usize);
                    self.record(SimOp::EraseSector { addr });
                }
                Ok(())
            }
            (commands::BLOCK_ERASE_64KB, Some(addr)) => {
                if self.wel {
                    self.wel = false;
                    self.erase_range(addr as usize, SIM_DEVICE.block_size as usize);
                    self.record(SimOp::EraseBlock { addr });
                }
                Ok(())
            }
            (commands::CHIP_ERASE, None) => {
                if self.wel {
                    self.wel = false;
                    self.erase_range(0, SIZE);
                    self.record(SimOp::EraseChip);
                }
                Ok(())
            }
            _ => Err(TransportError::Transfer),
        }
    }

    fn read(&mut self, cmd: &Command, buf: &mut [u8]) -> Result<(), TransportError> {
        self.take_transfer_fault()?;
        self.abort_mapped();
        match (cmd.instruction, cmd.address) {
            (commands::JEDEC_ID, None) => {
                let id = self.jedec_id;
                for (i, b) in buf.iter_mut().enumerate().take(3) {
                    *b = (id >> (16 - 8 * i)) as u8;
                }
                self.record(SimOp::ReadId);
                Ok(())
            }
            (commands::FAST_READ_QUAD_IO, Some(addr)) => {
                let start = addr as usize;
                let src = self
                    .mem
                    .get(start..start.saturating_add(buf.len()))
                    .ok_or(TransportError::Transfer)?;
                buf.copy_from_slice(src);
                self.record(SimOp::Read {
                    addr,
                    len: buf.len() as u32,
                });
                Ok(())
            }
            _ => Err(TransportError::Transfer),
        }
    }

    fn write(&mut self, cmd: &Command, data: &[u8]) -> Result<(), TransportError> {
        self.take_transfer_fault()?;
        self.abort_mapped();
        match (cmd.instruction, cmd.address) {
            (commands::PAGE_PROGRAM_QUAD, Some(addr)) => {
                if data.is_empty() || data.len() > PAGE {
                    return Err(TransportError::Transfer);
                }
                if !self.wel {
                    // Ignored without the latch, exactly like the hardware.
                    return Ok(());
                }
                self.wel = false;
                let page_base = (addr as usize) & !(PAGE - 1);
                let start_in_page = (addr as usize) & (PAGE - 1);
                for (i, &byte) in data.iter().enumerate() {
                    // The device wraps within the page: address bits above
                    // the page offset do not increment.
                    let dst = page_base + ((start_in_page + i) % PAGE);
                    if let Some(cell) = self.mem.get_mut(dst) {
                        *cell &= byte; // NOR: program only clears bits
                    } else {
                        return Err(TransportError::Transfer);
                    }
                }
                self.record(SimOp::Program {
                    addr,
                    len: data.len() as u32,
                });
                Ok(())
            }
            _ => Err(TransportError::Transfer),
        }
    }

    fn poll_status(
        &mut self,
        cmd: &Command,
        mask: u8,
        value: u8,
        timeout_ms: u32,
    ) -> Result<(), TransportError> {
        if cmd.instruction != commands::READ_STATUS_1 {
            return Err(TransportError::Transfer);
        }
        let _ = self.poll_log.push(timeout_ms);
        if self.fail_poll_once {
            self.fail_poll_once = false;
            return Err(TransportError::PollTimeout);
        }
        if self.status() & mask == value {
            Ok(())
        } else {
            // The status byte never changes between polls here, so a
            // mismatch is equivalent to polling out the full deadline.
            Err(TransportError::PollTimeout)
        }
    }

    fn memory_mapped(&mut self, read_cmd: &Command) -> Result<(), TransportError> {
        self.take_transfer_fault()?;
        if read_cmd.instruction != commands::FAST_READ_QUAD_IO {
            return Err(TransportError::Transfer);
        }
        self.mapped = true;
        self.record(SimOp::MemoryMapped);
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    /// A boundary-crossing program must wrap within the page, like the part.
    #[test]
    fn test_program_wraps_within_page() {
        let mut sim = SimFlash::<SIM_SIZE>::new();
        sim.wel = true;
        let cmd = Command::bare(commands::PAGE_PROGRAM_QUAD)
            .with_address(0x1FE)
            .quad_data();
        sim.write(&cmd, &[1, 2, 3, 4]).unwrap();
        assert_eq!(sim.mem[0x1FE], 1);
        assert_eq!(sim.mem[0x1FF], 2);
        assert_eq!(sim.mem[0x100], 3, "third byte wraps to the page base");
        assert_eq!(sim.mem[0x101], 4);
        assert_eq!(sim.mem[0x200], 0xFF, "next page untouched");
    }

    /// Programming only clears bits; erase is the only way back to 0xFF.
    #[test]
    fn test_program_is_and_semantics() {
        let mut sim = SimFlash::<SIM_SIZE>::new();
        sim.wel = true;
        let cmd = Command::bare(commands::PAGE_PROGRAM_QUAD)
            .with_address(0)
            .quad_data();
        sim.write(&cmd, &[0xF0]).unwrap();
        sim.wel = true;
        sim.write(&cmd, &[0x0F]).unwrap();
        assert_eq!(sim.mem[0], 0x00, "0xF0 & 0x0F must be 0x00");
    }

    /// Program without WEL is silently ignored.
    #[test]
    fn test_program_without_wel_is_ignored() {
        let mut sim = SimFlash::<SIM_SIZE>::new();
        let cmd = Command::bare(commands::PAGE_PROGRAM_QUAD)
            .with_address(0)
            .quad_data();
        sim.write(&cmd, &[0x00]).unwrap();
        assert_eq!(sim.mem[0], 0xFF);
        assert!(sim.journal().is_empty());
    }

    /// The stuck-byte injection survives exactly one erase.
    #[test]
    fn test_erase_stuck_injection() {
        let mut sim = SimFlash::<SIM_SIZE>::new();
        sim.inject_erase_stuck(0x1010, 0x7F);
        sim.wel = true;
        sim.command(
            &Command::bare(commands::SECTOR_ERASE_4KB).with_address(0x1000),
        )
        .unwrap();
        assert_eq!(sim.mem[0x1010], 0x7F);
        sim.wel = true;
        sim.command(
            &Command::bare(commands::SECTOR_ERASE_4KB).with_address(0x1000),
        )
        .unwrap();
        assert_eq!(sim.mem[0x1010], 0xFF, "second erase heals the cell");
    }
}

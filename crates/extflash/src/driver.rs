//! W25Q256JV NOR-flash driver over a [`QspiTransport`].
//!
//! Implements the device command protocol: reset, JEDEC-ID read, page
//! program, buffered multi-page write, sector/block/chip erase, quad read,
//! and memory-mapped (XiP) mode entry.
//!
//! # Error taxonomy
//!
//! Every operation returns one value from the closed [`FlashError`] set and
//! is terminal for that call — the driver performs **no internal retry**;
//! retry policy belongs to the caller. Transport errors propagate unchanged
//! in meaning: a busy-poll deadline maps to [`FlashError::AutoPoll`], a bus
//! fault to [`FlashError::Transfer`].
//!
//! # Concurrency contract
//!
//! A `NorDriver` is **not thread-safe**. The command/address/data phases of
//! a transaction are not atomic with respect to another context's
//! transaction, so callers under a multitasking scheduler must hold a mutex
//! or critical section around each logical operation — see
//! [`crate::shared::SharedFlash`]. The driver itself stays lock-free and
//! allocation-free so it is host-testable without a scheduler.

use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};

use crate::commands;
use crate::device::FlashDevice;
use crate::transport::{Command, QspiTransport, TransportError};

/// Busy-poll budget after a reset instruction (device tRST is 30 µs; the
/// budget covers a reset issued mid-erase, where tRST stretches to ms class).
const RESET_READY_MS: u32 = 50;

/// Busy-poll budget for the write-enable latch to read back set.
const WRITE_ENABLE_MS: u32 = 5;

/// Read-chunk size for the sector-emptiness scan.
const EMPTY_SCAN_CHUNK: usize = 64;

/// Driver-level failures. One closed enum; conversions to the utility
/// layer's error type happen at that boundary, never by reusing raw values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Reset or identification failed during bring-up.
    Init,
    /// The write-enable latch did not report set.
    WriteEnable,
    /// A busy-poll deadline elapsed (status never matched).
    AutoPoll,
    /// The erase instruction itself was rejected by the bus.
    Erase,
    /// A command or data transfer failed at the bus level.
    Transfer,
    /// Operation unavailable: the transport is in memory-mapped mode and
    /// must be re-initialized (via [`NorDriver::reset`]) first.
    MemoryMapped,
    /// The requested range falls outside the device.
    OutOfBounds,
    /// The requested range violates an alignment or page-boundary rule.
    NotAligned,
}

impl From<TransportError> for FlashError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Transfer => Self::Transfer,
            TransportError::PollTimeout => Self::AutoPoll,
        }
    }
}

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            Self::OutOfBounds => NorFlashErrorKind::OutOfBounds,
            Self::NotAligned => NorFlashErrorKind::NotAligned,
            _ => NorFlashErrorKind::Other,
        }
    }
}

/// NOR-flash driver instance.
///
/// An explicit instance object — transport handle, device descriptor, and
/// mode flag travel together, so multiple simulated instances can coexist
/// under test and nothing driver-related lives in a global.
pub struct NorDriver<T: QspiTransport> {
    transport: T,
    device: FlashDevice,
    mapped: bool,
}

impl<T: QspiTransport> NorDriver<T> {
    /// Wrap a transport. Touches no hardware; call [`Self::init`] (or
    /// [`Self::reset`]) before the first operation after power-up.
    pub fn new(transport: T, device: FlashDevice) -> Self {
        Self {
            transport,
            device,
            mapped: false,
        }
    }

    /// The device descriptor this driver was built for.
    pub fn device(&self) -> &FlashDevice {
        &self.device
    }

    /// `true` once [`Self::memory_mapped_mode`] has been entered and no
    /// reset has happened since. While set, every ordinary operation fails
    /// with [`FlashError::MemoryMapped`].
    pub fn is_memory_mapped(&self) -> bool {
        self.mapped
    }

    /// Consume the driver, returning the transport (test hook).
    pub fn release(self) -> T {
        self.transport
    }

    /// Borrow the transport directly. Available to host tests only, for
    /// fault injection and journal inspection on the simulated device.
    #[cfg(any(test, feature = "sim"))]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Reset the device and verify its JEDEC identity.
    ///
    /// Returns [`FlashError::Init`] when the ID read back does not match the
    /// descriptor's expectation (including the all-zero transport-failure
    /// case: valid JEDEC IDs are never 0).
    pub fn init(&mut self) -> Result<(), FlashError> {
        self.reset()?;
        let id = self.read_id();
        if id != self.device.jedec_id {
            return Err(FlashError::Init);
        }
        Ok(())
    }

    /// Software-reset the device: enable-reset then reset-device, each
    /// followed by a ready-poll, then re-enter 4-byte address mode (the
    /// reset drops the part back to 24-bit addressing, which cannot reach
    /// the upper 16 MB).
    ///
    /// Must be called before the first ID read after power-up. Also the
    /// designated way out of memory-mapped mode: it re-initializes the
    /// transport into indirect mode and clears the mode flag.
    pub fn reset(&mut self) -> Result<(), FlashError> {
        self.transport
            .command(&Command::bare(commands::ENABLE_RESET))
            .map_err(|_| FlashError::Init)?;
        self.poll_ready(RESET_READY_MS)
            .map_err(|_| FlashError::Init)?;
        self.transport
            .command(&Command::bare(commands::RESET_DEVICE))
            .map_err(|_| FlashError::Init)?;
        self.poll_ready(RESET_READY_MS)
            .map_err(|_| FlashError::Init)?;
        self.transport
            .command(&Command::bare(commands::ENTER_4BYTE_ADDRESS_MODE))
            .map_err(|_| FlashError::Init)?;
        self.mapped = false;
        Ok(())
    }

    /// Read the 24-bit JEDEC identifier (manufacturer + type + capacity).
    ///
    /// Returns 0 on transport failure — a valid ID is never 0, so the two
    /// cases stay distinguishable through the coarse loader ABI.
    pub fn read_id(&mut self) -> u32 {
        if self.mapped {
            return 0;
        }
        let mut id = [0u8; 3];
        let cmd = Command::bare(commands::JEDEC_ID).single_data();
        match self.transport.read(&cmd, &mut id) {
            Ok(()) => {
                let [mf, ty, cap] = id;
                (u32::from(mf) << 16) | (u32::from(ty) << 8) | u32::from(cap)
            }
            Err(_) => 0,
        }
    }

    /// Set the device's write latch and poll until hardware reports it set.
    ///
    /// Hardware clears WEL when each program/erase completes, so the driver
    /// never assumes one write-enable persists across the following
    /// busy-poll — it re-asserts before every program and erase instruction.
    pub fn write_enable(&mut self) -> Result<(), FlashError> {
        self.guard_mapped()?;
        self.transport
            .command(&Command::bare(commands::WRITE_ENABLE))
            .map_err(|_| FlashError::WriteEnable)?;
        let status = Command::bare(commands::READ_STATUS_1).single_data();
        self.transport
            .poll_status(
                &status,
                commands::STATUS_WEL,
                commands::STATUS_WEL,
                WRITE_ENABLE_MS,
            )
            .map_err(|_| FlashError::WriteEnable)
    }

    /// Program at most one page (≤ 256 bytes) at `offset`.
    ///
    /// The caller guarantees the range does not cross a page boundary:
    /// the device wraps within the page rather than erroring, silently
    /// corrupting data. [`Self::write_buffer`] performs that decomposition;
    /// a violating range is rejected here with [`FlashError::NotAligned`].
    ///
    /// This is the raw program transaction only — bracket it with
    /// [`Self::write_enable`] before and a ready-poll after, as
    /// `write_buffer` does.
    pub fn write_page(&mut self, offset: u32, data: &[u8]) -> Result<(), FlashError> {
        self.guard_mapped()?;
        let len = u32::try_from(data.len()).map_err(|_| FlashError::OutOfBounds)?;
        if len == 0 || len > self.device.page_size {
            return Err(FlashError::NotAligned);
        }
        #[allow(clippy::arithmetic_side_effects)] // len ≤ page_size, both checked above
        if (offset % self.device.page_size) + len > self.device.page_size {
            return Err(FlashError::NotAligned);
        }
        if !self.device.contains(offset, len) {
            return Err(FlashError::OutOfBounds);
        }
        let cmd = Command::bare(commands::PAGE_PROGRAM_QUAD)
            .with_address(offset)
            .quad_data();
        self.transport
            .write(&cmd, data)
            .map_err(|_| FlashError::Transfer)
    }

    /// Program an arbitrary-length, arbitrary-alignment range.
    ///
    /// Decomposed into a first partial page (up to the next page boundary,
    /// or the whole write if it already fits), then whole pages, then a
    /// final partial page. Each chunk runs write-enable → program →
    /// ready-poll sequentially; the first error aborts and propagates.
    pub fn write_buffer(&mut self, offset: u32, data: &[u8]) -> Result<(), FlashError> {
        self.guard_mapped()?;
        let total = u32::try_from(data.len()).map_err(|_| FlashError::OutOfBounds)?;
        if !self.device.contains(offset, total) {
            return Err(FlashError::OutOfBounds);
        }

        let page = self.device.page_size;
        let mut written: u32 = 0;
        #[allow(clippy::arithmetic_side_effects)] // written < total ≤ device size, chunk ≤ page
        while written < total {
            let addr = offset + written;
            let to_boundary = page - (addr % page);
            let chunk = to_boundary.min(total - written);
            let slice = data
                .get(written as usize..(written + chunk) as usize)
                .ok_or(FlashError::OutOfBounds)?;
            self.write_enable()?;
            self.write_page(addr, slice)?;
            self.poll_ready(self.device.page_program_ms)?;
            written += chunk;
        }
        Ok(())
    }

    /// Quad-I/O fast read of arbitrary length in one transaction. Reads do
    /// not wrap, so there is no page constraint.
    pub fn read_buffer(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        self.guard_mapped()?;
        let len = u32::try_from(buf.len()).map_err(|_| FlashError::OutOfBounds)?;
        if !self.device.contains(offset, len) {
            return Err(FlashError::OutOfBounds);
        }
        if buf.is_empty() {
            return Ok(());
        }
        let cmd = Command::bare(commands::FAST_READ_QUAD_IO)
            .with_address(offset)
            .quad_address()
            .with_dummy(platform::qspi_config::QSPI_DUMMY_CYCLES)
            .quad_data();
        self.transport
            .read(&cmd, buf)
            .map_err(|_| FlashError::Transfer)
    }

    /// Erase the 4 KiB sector at `offset` (must be sector-aligned).
    ///
    /// Post-condition at the device level: the sector reads as the erase
    /// value everywhere. Verifying that is a *caller* responsibility — the
    /// utility layer's verified erase — not enforced here.
    pub fn erase_sector(&mut self, offset: u32) -> Result<(), FlashError> {
        self.erase_unit(
            commands::SECTOR_ERASE_4KB,
            offset,
            self.device.sector_size,
            self.device.sector_erase_ms,
        )
    }

    /// Erase the 64 KiB block at `offset` (must be block-aligned).
    pub fn erase_block(&mut self, offset: u32) -> Result<(), FlashError> {
        self.erase_unit(
            commands::BLOCK_ERASE_64KB,
            offset,
            self.device.block_size,
            self.device.block_erase_ms,
        )
    }

    /// Erase the whole device. Blocks for up to the chip-erase budget
    /// (~100 s class); there is no abort-in-flight path once issued.
    pub fn erase_chip(&mut self) -> Result<(), FlashError> {
        self.guard_mapped()?;
        self.write_enable()?;
        self.transport
            .command(&Command::bare(commands::CHIP_ERASE))
            .map_err(|_| FlashError::Erase)?;
        self.poll_ready(self.device.chip_erase_ms)
    }

    /// Enter continuous memory-mapped read mode at the device's base
    /// address.
    ///
    /// Resets the device first, so calling this twice in a row succeeds
    /// without an intervening explicit [`Self::reset`]. After it returns,
    /// ordinary command/read operations fail with
    /// [`FlashError::MemoryMapped`] until the driver is reset — a one-way
    /// transition the caller must track.
    pub fn memory_mapped_mode(&mut self) -> Result<(), FlashError> {
        self.reset()?;
        let read_cmd = Command::bare(commands::FAST_READ_QUAD_IO)
            .quad_address()
            .with_dummy(platform::qspi_config::QSPI_DUMMY_CYCLES)
            .quad_data();
        self.transport
            .memory_mapped(&read_cmd)
            .map_err(|_| FlashError::MemoryMapped)?;
        self.mapped = true;
        Ok(())
    }

    /// Scan the sector containing `offset` in fixed-size chunks,
    /// short-circuiting on the first byte that is not the erase value.
    pub fn is_sector_empty(&mut self, offset: u32) -> Result<bool, FlashError> {
        let base = self.device.sector_base(offset);
        let mut chunk = [0u8; EMPTY_SCAN_CHUNK];
        let mut scanned: u32 = 0;
        #[allow(clippy::arithmetic_side_effects)] // scanned < sector_size, chunk fits
        while scanned < self.device.sector_size {
            self.read_buffer(base + scanned, &mut chunk)?;
            if chunk.iter().any(|&b| b != self.device.erase_value) {
                return Ok(false);
            }
            scanned += EMPTY_SCAN_CHUNK as u32;
        }
        Ok(true)
    }

    // ── internals ────────────────────────────────────────────────────────────

    fn guard_mapped(&self) -> Result<(), FlashError> {
        if self.mapped {
            return Err(FlashError::MemoryMapped);
        }
        Ok(())
    }

    /// Poll Status Register-1 until BUSY clears or `timeout_ms` elapses.
    fn poll_ready(&mut self, timeout_ms: u32) -> Result<(), FlashError> {
        let status = Command::bare(commands::READ_STATUS_1).single_data();
        self.transport
            .poll_status(&status, commands::STATUS_BUSY, 0, timeout_ms)
            .map_err(FlashError::from)
    }

    #[allow(clippy::arithmetic_side_effects)] // unit is a non-zero device constant
    fn erase_unit(
        &mut self,
        instruction: u8,
        offset: u32,
        unit: u32,
        budget_ms: u32,
    ) -> Result<(), FlashError> {
        self.guard_mapped()?;
        if offset % unit != 0 {
            return Err(FlashError::NotAligned);
        }
        if !self.device.contains(offset, unit) {
            return Err(FlashError::OutOfBounds);
        }
        self.write_enable()?;
        self.transport
            .command(&Command::bare(instruction).with_address(offset))
            .map_err(|_| FlashError::Erase)?;
        self.poll_ready(budget_ms)
    }
}

// ── embedded-storage trait surface ───────────────────────────────────────────
//
// The blocking NorFlash traits are the ecosystem contract other components
// (filesystem glue, OTA staging) program against. Offsets are device-relative,
// matching the driver's own addressing.

impl<T: QspiTransport> ErrorType for NorDriver<T> {
    type Error = FlashError;
}

impl<T: QspiTransport> ReadNorFlash for NorDriver<T> {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.read_buffer(offset, bytes)
    }

    fn capacity(&self) -> usize {
        self.device.size as usize
    }
}

impl<T: QspiTransport> NorFlash for NorDriver<T> {
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = 4096;

    #[allow(clippy::arithmetic_side_effects)] // sector_size is a non-zero device constant
    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if from > to || !self.device.contains(from, to.saturating_sub(from)) {
            return Err(FlashError::OutOfBounds);
        }
        if from % self.device.sector_size != 0 || to % self.device.sector_size != 0 {
            return Err(FlashError::NotAligned);
        }
        let mut sector = from;
        #[allow(clippy::arithmetic_side_effects)] // sector < to ≤ device size
        while sector < to {
            self.erase_sector(sector)?;
            sector += self.device.sector_size;
        }
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        self.write_buffer(offset, bytes)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

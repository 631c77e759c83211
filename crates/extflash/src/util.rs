//! Safety wrapper over the NOR driver: erase-before-write, verified erase,
//! data verification, health test, and per-instance statistics.
//!
//! The driver is region-agnostic and trusts its caller; this layer is where
//! partial-sector writes become safe. NOR flash can only clear bits via
//! programming — going back to 1s requires a sector erase — so writing into
//! a non-empty sector means read-modify-erase-write of the whole sector.
//! That is O(sectors touched) erase operations: a caller writing a few bytes
//! against non-empty flash pays a full-sector erase. Documented, not hidden.

use crate::device::FlashDevice;
use crate::driver::{FlashError, NorDriver};
use crate::transport::QspiTransport;

/// Scratch capacity: one erase sector. The wrapper supports parts with
/// sectors up to this size (every W25Q part in the family uses 4 KiB).
const SCRATCH_SIZE: usize = 4096;

/// Read/compare chunk size for verification scans.
const VERIFY_CHUNK: usize = 256;

/// Millisecond clock used to accumulate operation timings in the stats.
///
/// Host tests pass a fake; hardware passes an `embassy_time::Instant`-backed
/// function. The default clock reads 0 forever, which zeroes the timing
/// stats without disturbing the counters.
pub type ClockMs = fn() -> u32;

/// Utility-layer failures.
///
/// Driver errors pass through unchanged inside [`UtilError::Driver`]; the
/// remaining variants are integrity failures this layer detects itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UtilError {
    /// The underlying driver operation failed.
    Driver(FlashError),
    /// An erase reported success but a byte still reads back wrong —
    /// worn or failing cells. Carries the first offending offset.
    EraseVerify {
        /// Device offset of the first byte that did not match the erase value.
        offset: u32,
    },
    /// Read-back comparison against expected data failed.
    Mismatch {
        /// Device offset of the first differing byte.
        offset: u32,
    },
    /// The part identifies as something other than the descriptor expects.
    IdMismatch {
        /// JEDEC ID actually read (0 = transport failure).
        found: u32,
    },
}

impl From<FlashError> for UtilError {
    fn from(e: FlashError) -> Self {
        Self::Driver(e)
    }
}

/// Per-error-kind counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrorCounts {
    /// Bus transfer failures.
    pub transfer: u32,
    /// Busy-poll timeouts.
    pub auto_poll: u32,
    /// Write-enable latch failures.
    pub write_enable: u32,
    /// Erase instruction failures.
    pub erase: u32,
    /// Integrity failures detected by this layer (verify / erase-verify).
    pub integrity: u32,
    /// Everything else (init, bounds, mode).
    pub other: u32,
}

/// Process-wide-style diagnostics, made per-instance (a field of
/// [`FlashUtil`], never a free-standing global) so multiple simulated
/// instances can coexist under test. Zeroed at construction; not persisted
/// across resets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashStats {
    /// Completed read operations.
    pub reads: u32,
    /// Completed write operations.
    pub writes: u32,
    /// Completed erase operations (sector or block).
    pub erases: u32,
    /// Bytes read through this layer.
    pub bytes_read: u64,
    /// Bytes written through this layer.
    pub bytes_written: u64,
    /// Cumulative wall-clock spent in operations (ms, per the instance's
    /// clock — 0 under the default clock).
    pub op_ms: u64,
    /// Failure counters by category.
    pub errors: ErrorCounts,
}

impl FlashStats {
    fn record_error(&mut self, e: &UtilError) {
        match e {
            UtilError::Driver(FlashError::Transfer) => self.errors.transfer += 1,
            UtilError::Driver(FlashError::AutoPoll) => self.errors.auto_poll += 1,
            UtilError::Driver(FlashError::WriteEnable) => self.errors.write_enable += 1,
            UtilError::Driver(FlashError::Erase) => self.errors.erase += 1,
            UtilError::EraseVerify { .. } | UtilError::Mismatch { .. } => {
                self.errors.integrity += 1;
            }
            _ => self.errors.other += 1,
        }
    }
}

/// Safety wrapper instance. Owns the driver, the statistics, and the
/// sector scratch buffer (4 KiB — keep instances in a `static`/`StaticCell`,
/// not on a task stack).
pub struct FlashUtil<T: QspiTransport> {
    driver: NorDriver<T>,
    stats: FlashStats,
    clock: ClockMs,
    scratch: [u8; SCRATCH_SIZE],
}

#[allow(clippy::arithmetic_side_effects)] // offsets bounds-checked against the device before use
impl<T: QspiTransport> FlashUtil<T> {
    /// Wrap a driver with zeroed statistics and the null clock.
    pub fn new(driver: NorDriver<T>) -> Self {
        Self::with_clock(driver, || 0)
    }

    /// Wrap a driver, timing operations against `clock`.
    pub fn with_clock(driver: NorDriver<T>, clock: ClockMs) -> Self {
        debug_assert!(driver.device().sector_size as usize <= SCRATCH_SIZE);
        Self {
            driver,
            stats: FlashStats::default(),
            clock,
            scratch: [0xFF; SCRATCH_SIZE],
        }
    }

    /// The wrapped device descriptor.
    pub fn device(&self) -> &FlashDevice {
        self.driver.device()
    }

    /// Diagnostics snapshot (read-only).
    pub fn stats(&self) -> &FlashStats {
        &self.stats
    }

    /// Direct driver access for operations this layer does not wrap
    /// (memory-mapped entry, chip erase). Bypasses statistics.
    pub fn driver_mut(&mut self) -> &mut NorDriver<T> {
        &mut self.driver
    }

    /// Consume the wrapper, returning the driver.
    pub fn release(self) -> NorDriver<T> {
        self.driver
    }

    /// Read `buf.len()` bytes at `offset`, with accounting.
    pub fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), UtilError> {
        let started = (self.clock)();
        let result = self.driver.read_buffer(offset, buf).map_err(UtilError::from);
        self.conclude(started, result)?;
        self.stats.reads += 1;
        self.stats.bytes_read += buf.len() as u64;
        Ok(())
    }

    /// Write `data` at `offset`, erasing as needed and preserving every byte
    /// of the touched sectors outside the requested range.
    ///
    /// Per touched sector: if the sector already reads fully erased, the
    /// portion is written directly; otherwise the sector is read into the
    /// scratch buffer, the new bytes are overlaid, the sector is erased,
    /// and the merged image is written back.
    pub fn write_with_erase(&mut self, offset: u32, data: &[u8]) -> Result<(), UtilError> {
        let len = u32::try_from(data.len()).map_err(|_| FlashError::OutOfBounds)?;
        if !self.device().contains(offset, len) {
            return Err(FlashError::OutOfBounds.into());
        }
        if data.is_empty() {
            return Ok(());
        }
        let started = (self.clock)();
        let result = self.write_all_sectors(offset, data, len);
        self.conclude(started, result)?;
        self.stats.writes += 1;
        self.stats.bytes_written += u64::from(len);
        Ok(())
    }

    fn write_all_sectors(&mut self, offset: u32, data: &[u8], len: u32) -> Result<(), UtilError> {
        let sector_size = self.device().sector_size;
        let end = offset + len;

        let mut sector = self.device().sector_base(offset);
        while sector < end {
            let span_start = sector.max(offset);
            let span_end = (sector + sector_size).min(end);
            let portion = data
                .get((span_start - offset) as usize..(span_end - offset) as usize)
                .ok_or(FlashError::OutOfBounds)?;
            self.write_sector_portion(sector, span_start, portion)?;
            sector += sector_size;
        }
        Ok(())
    }

    /// Erase the sector at `offset`, then read it back and require every
    /// byte to equal the erase value. A mismatch is reported as
    /// [`UtilError::EraseVerify`] — distinct from a device-reported erase
    /// failure — to expose worn or failing cells.
    pub fn erase_sector_verified(&mut self, offset: u32) -> Result<(), UtilError> {
        let started = (self.clock)();
        let base = self.device().sector_base(offset);
        let size = self.device().sector_size;
        let result = self
            .driver
            .erase_sector(base)
            .map_err(UtilError::from)
            .and_then(|()| self.check_erased(base, size));
        self.conclude(started, result)?;
        self.stats.erases += 1;
        Ok(())
    }

    /// Erase the 64 KiB block at `offset`, with read-back verification.
    pub fn erase_block_verified(&mut self, offset: u32) -> Result<(), UtilError> {
        let started = (self.clock)();
        let base = self.device().block_base(offset);
        let size = self.device().block_size;
        let result = self
            .driver
            .erase_block(base)
            .map_err(UtilError::from)
            .and_then(|()| self.check_erased(base, size));
        self.conclude(started, result)?;
        self.stats.erases += 1;
        Ok(())
    }

    /// Chunked read-compare of `expected` against the device contents at
    /// `offset`. On mismatch, reports the absolute offset of the first
    /// differing byte.
    pub fn verify(&mut self, offset: u32, expected: &[u8]) -> Result<(), UtilError> {
        let started = (self.clock)();
        let result = self.verify_inner(offset, expected);
        self.conclude(started, result)?;
        self.stats.reads += 1;
        self.stats.bytes_read += expected.len() as u64;
        Ok(())
    }

    fn verify_inner(&mut self, offset: u32, expected: &[u8]) -> Result<(), UtilError> {
        let mut checked: usize = 0;
        let mut chunk = [0u8; VERIFY_CHUNK];
        while checked < expected.len() {
            let n = VERIFY_CHUNK.min(expected.len() - checked);
            let window = chunk.get_mut(..n).ok_or(FlashError::OutOfBounds)?;
            self.driver
                .read_buffer(offset + checked as u32, window)
                .map_err(UtilError::from)?;
            let want = expected
                .get(checked..checked + n)
                .ok_or(FlashError::OutOfBounds)?;
            if let Some(i) = window.iter().zip(want).position(|(a, b)| a != b) {
                return Err(UtilError::Mismatch {
                    offset: offset + (checked + i) as u32,
                });
            }
            checked += n;
        }
        Ok(())
    }

    /// Composite smoke test: identity check, then an erase/write/read/erase
    /// round-trip on the top sector of the address space. Not exhaustive —
    /// a quick field check that the part, bus, and driver agree.
    pub fn health_test(&mut self) -> Result<(), UtilError> {
        let found = self.driver.read_id();
        if found != self.device().jedec_id {
            let err = UtilError::IdMismatch { found };
            self.stats.record_error(&err);
            return Err(err);
        }

        let sector = self.device().size - self.device().sector_size;
        self.erase_sector_verified(sector)?;

        let mut pattern = [0u8; 256];
        for (i, b) in pattern.iter_mut().enumerate() {
            *b = (i as u8) ^ 0xA5;
        }
        let page = sector + self.device().sector_size - 256;
        self.write_with_erase(page, &pattern)?;
        self.verify(page, &pattern)?;
        self.erase_sector_verified(sector)
    }

    // ── internals ────────────────────────────────────────────────────────────

    fn write_sector_portion(
        &mut self,
        sector: u32,
        span_start: u32,
        portion: &[u8],
    ) -> Result<(), UtilError> {
        let sector_size = self.device().sector_size as usize;
        if self.driver.is_sector_empty(sector)? {
            // Already erased — program the portion directly, no erase cost.
            self.driver.write_buffer(span_start, portion)?;
            return Ok(());
        }

        let scratch = self
            .scratch
            .get_mut(..sector_size)
            .ok_or(FlashError::OutOfBounds)?;
        self.driver.read_buffer(sector, scratch)?;
        let at = (span_start - sector) as usize;
        scratch
            .get_mut(at..at + portion.len())
            .ok_or(FlashError::OutOfBounds)?
            .copy_from_slice(portion);

        self.driver.erase_sector(sector)?;
        self.stats.erases += 1;
        let merged = self
            .scratch
            .get(..sector_size)
            .ok_or(FlashError::OutOfBounds)?;
        self.driver.write_buffer(sector, merged)?;
        Ok(())
    }

    fn check_erased(&mut self, base: u32, size: u32) -> Result<(), UtilError> {
        let erase_value = self.device().erase_value;
        let mut chunk = [0u8; VERIFY_CHUNK];
        let mut scanned: u32 = 0;
        while scanned < size {
            self.driver.read_buffer(base + scanned, &mut chunk)?;
            if let Some(i) = chunk.iter().position(|&b| b != erase_value) {
                return Err(UtilError::EraseVerify {
                    offset: base + scanned + i as u32,
                });
            }
            scanned += VERIFY_CHUNK as u32;
        }
        Ok(())
    }

    /// Timing accumulation + error bookkeeping for one finished operation.
    fn conclude<R>(&mut self, started: u32, result: Result<R, UtilError>) -> Result<R, UtilError> {
        self.stats.op_ms += u64::from((self.clock)().saturating_sub(started));
        if let Err(e) = &result {
            self.stats.record_error(e);
        }
        result
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::sim::{SimFlash, SimOp, SIM_DEVICE, SIM_SIZE};

    fn util() -> FlashUtil<SimFlash<SIM_SIZE>> {
        let mut driver = NorDriver::new(SimFlash::new(), SIM_DEVICE);
        driver.init().unwrap();
        FlashUtil::new(driver)
    }

    /// Writing into the middle of a non-empty sector must preserve the
    /// bytes before and after the written range.
    #[test]
    fn test_write_with_erase_preserves_neighbors() {
        let mut u = util();
        // Arbitrary pre-existing sector content via the backdoor.
        let mut old = [0u8; 4096];
        for (i, b) in old.iter_mut().enumerate() {
            *b = (i % 241) as u8;
        }
        u.driver_mut().transport_mut().fill(0x1000, &old);

        let new = [0xEEu8; 64];
        u.write_with_erase(0x1800, &new).unwrap();

        let mut readback = vec![0u8; 4096];
        u.read(0x1000, &mut readback).unwrap();
        assert_eq!(&readback[..0x800], &old[..0x800], "prefix preserved");
        assert_eq!(&readback[0x800..0x840], &new[..], "new bytes landed");
        assert_eq!(&readback[0x840..], &old[0x840..], "suffix preserved");
    }

    /// Writing to an already-empty sector must not erase at all.
    #[test]
    fn test_write_with_erase_skips_erase_on_empty_sector() {
        let mut u = util();
        u.write_with_erase(0x2100, &[1, 2, 3, 4]).unwrap();
        let erases = u
            .driver_mut()
            .transport_mut()
            .journal()
            .iter()
            .filter(|op| matches!(op, SimOp::EraseSector { .. }))
            .count();
        assert_eq!(erases, 0, "empty sector must be written without erasing");

        let mut got = [0u8; 4];
        u.read(0x2100, &mut got).unwrap();
        assert_eq!(got, [1, 2, 3, 4]);
    }

    /// A write spanning two sectors merges correctly in both.
    #[test]
    fn test_write_with_erase_across_sector_boundary() {
        let mut u = util();
        u.driver_mut().transport_mut().fill(0x1FF0, &[0x11u8; 32]); // straddles 0x2000
        let data: Vec<u8> = (0..64u32).map(|i| i as u8).collect();
        u.write_with_erase(0x1FE0, &data).unwrap();

        let mut got = [0u8; 64];
        u.read(0x1FE0, &mut got).unwrap();
        assert_eq!(&got[..], &data[..]);
    }

    /// Verified erase distinguishes a worn cell from a failed erase op:
    /// the device reports success, the read-back disagrees.
    #[test]
    fn test_erase_verify_reports_stuck_byte() {
        let mut u = util();
        u.driver_mut().transport_mut().inject_erase_stuck(0x1010, 0x7F);
        let err = u.erase_sector_verified(0x1000).unwrap_err();
        assert_eq!(
            err,
            UtilError::EraseVerify { offset: 0x1010 },
            "stuck byte must surface as EraseVerify with its offset"
        );
        assert_eq!(u.stats().errors.integrity, 1);

        // A clean sector passes.
        u.erase_sector_verified(0x2000).unwrap();
    }

    #[test]
    fn test_verify_reports_first_differing_offset() {
        let mut u = util();
        u.write_with_erase(0x3000, &[0xAA; 600]).unwrap();
        let mut expected = [0xAAu8; 600];
        expected[300] = 0xAB;
        let err = u.verify(0x3000, &expected).unwrap_err();
        assert_eq!(err, UtilError::Mismatch { offset: 0x3000 + 300 });
    }

    /// Block erase verifies the whole 64 KiB unit and clears every sector
    /// inside it.
    #[test]
    fn test_erase_block_verified() {
        let mut u = util();
        u.write_with_erase(0x0800, &[0x5A; 128]).unwrap();
        u.write_with_erase(0x1_8800, &[0x5A; 128]).unwrap(); // second block
        u.erase_block_verified(0x0000).unwrap();
        assert!(u.driver_mut().is_sector_empty(0x0800).unwrap());
        // The sibling block keeps its data.
        let mut got = [0u8; 128];
        u.read(0x1_8800, &mut got).unwrap();
        assert_eq!(got, [0x5A; 128]);
    }

    #[test]
    fn test_health_test_round_trip() {
        let mut u = util();
        u.health_test().unwrap();
        // The top sector ends the test erased.
        let top = SIM_DEVICE.size - SIM_DEVICE.sector_size;
        assert!(u.driver_mut().is_sector_empty(top).unwrap());
    }

    #[test]
    fn test_health_test_rejects_wrong_id() {
        let mut driver = NorDriver::new(SimFlash::<SIM_SIZE>::new(), SIM_DEVICE);
        driver.init().unwrap();
        let mut u = FlashUtil::new(driver);
        u.driver_mut().transport_mut().set_jedec_id(0x0011_22);
        assert_eq!(
            u.health_test().unwrap_err(),
            UtilError::IdMismatch { found: 0x0011_22 }
        );
    }

    #[test]
    fn test_stats_accounting() {
        let mut u = util();
        u.write_with_erase(0, &[0u8; 10]).unwrap();
        let mut buf = [0u8; 10];
        u.read(0, &mut buf).unwrap();
        let s = u.stats();
        assert_eq!(s.writes, 1);
        assert_eq!(s.bytes_written, 10);
        assert_eq!(s.reads, 1);
        assert_eq!(s.bytes_read, 10);
    }
}

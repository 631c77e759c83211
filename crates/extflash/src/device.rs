//! Flash device descriptors.
//!
//! A [`FlashDevice`] is compiled-in, read-only physical geometry: sizes,
//! erase units, erase value, and the per-operation timing budgets the
//! driver's busy-polls are bounded by. The external-loader adapter also
//! serializes this descriptor into the host tool's discovery section (see
//! the loader crate).

use platform::memory_map;

/// Device class, as understood by the host programming tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceType {
    /// Serial NOR flash behind the QUADSPI controller.
    NorFlash,
}

impl DeviceType {
    /// Wire encoding used by the external-loader descriptor (v1 layout).
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::NorFlash => 1,
        }
    }
}

/// Static, read-only description of one flash part.
///
/// Never mutated; the driver copies it by value. The invariant that
/// `[base_address, base_address + size)` does not overlap the internal-flash
/// bootloader reservation is asserted in tests against
/// [`platform::memory_map`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashDevice {
    /// Device name, as reported to the host tool.
    pub name: &'static str,
    /// Device class.
    pub device_type: DeviceType,
    /// CPU-visible base address in memory-mapped mode.
    pub base_address: u32,
    /// Total capacity in bytes.
    pub size: u32,
    /// Program page size in bytes (a single program transaction must not
    /// cross a page boundary — the device wraps, silently corrupting data).
    pub page_size: u32,
    /// Erase sector size in bytes (smallest erase unit).
    pub sector_size: u32,
    /// Erase block size in bytes.
    pub block_size: u32,
    /// Value every byte of an erased range reads as.
    pub erase_value: u8,
    /// Expected JEDEC identifier; [`crate::driver::NorDriver::init`] fails
    /// when the part reports anything else.
    pub jedec_id: u32,
    /// Page-program busy-poll budget (ms).
    pub page_program_ms: u32,
    /// Sector-erase busy-poll budget (ms).
    pub sector_erase_ms: u32,
    /// Block-erase busy-poll budget (ms).
    pub block_erase_ms: u32,
    /// Chip-erase busy-poll budget (ms) — ~100 s class on a 32 MB part.
    pub chip_erase_ms: u32,
}

impl FlashDevice {
    /// Round `offset` down to the containing sector's base.
    #[must_use]
    pub fn sector_base(&self, offset: u32) -> u32 {
        offset & !(self.sector_size - 1)
    }

    /// Round `offset` down to the containing block's base.
    #[must_use]
    pub fn block_base(&self, offset: u32) -> u32 {
        offset & !(self.block_size - 1)
    }

    /// `true` when `[offset, offset + len)` lies inside the device.
    #[must_use]
    pub fn contains(&self, offset: u32, len: u32) -> bool {
        offset
            .checked_add(len)
            .is_some_and(|end| end <= self.size)
    }
}

/// Expected JEDEC identifier for the board's part (Winbond W25Q256JV):
/// manufacturer 0xEF, device type 0x40, capacity 0x19 (2^25 = 32 MB).
///
/// A valid JEDEC ID is never 0, so `read_id() == 0` unambiguously signals a
/// transport failure.
pub const JEDEC_ID_W25Q256JV: u32 = 0x00EF_4019;

/// The board's external NOR part.
pub const W25Q256JV: FlashDevice = FlashDevice {
    name: "EMBER_W25Q256_STM32H750",
    device_type: DeviceType::NorFlash,
    base_address: memory_map::QSPI_MAPPED_BASE,
    size: 32 * 1024 * 1024,
    page_size: 256,
    sector_size: 4 * 1024,
    block_size: 64 * 1024,
    erase_value: 0xFF,
    jedec_id: JEDEC_ID_W25Q256JV,
    // Datasheet maximums with margin: tPP 3 ms, tSE 400 ms, tBE 2000 ms,
    // tCE 400 s max but 120 s typ on healthy parts — we budget the typ
    // figure and let the host tool decide on retries for worn devices.
    page_program_ms: 5,
    sector_erase_ms: 400,
    block_erase_ms: 2_000,
    chip_erase_ms: 120_000,
};

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Descriptor invariant: the device window must never overlap the
    /// internal-flash region reserved for the bootloader itself.
    #[test]
    fn test_device_does_not_overlap_bootloader() {
        assert!(!memory_map::overlaps_bootloader(
            W25Q256JV.base_address,
            W25Q256JV.size
        ));
    }

    #[test]
    fn test_geometry_relationships() {
        assert_eq!(W25Q256JV.block_size % W25Q256JV.sector_size, 0);
        assert_eq!(W25Q256JV.sector_size % W25Q256JV.page_size, 0);
        assert_eq!(W25Q256JV.size % W25Q256JV.block_size, 0);
    }

    #[test]
    fn test_sector_and_block_rounding() {
        assert_eq!(W25Q256JV.sector_base(0x0000_1234), 0x0000_1000);
        assert_eq!(W25Q256JV.sector_base(0x0000_1000), 0x0000_1000);
        assert_eq!(W25Q256JV.block_base(0x0001_F234), 0x0001_0000);
        assert_eq!(W25Q256JV.block_base(0x0002_0000), 0x0002_0000);
    }

    #[test]
    fn test_contains_bounds() {
        assert!(W25Q256JV.contains(0, 1));
        assert!(W25Q256JV.contains(W25Q256JV.size - 1, 1));
        assert!(!W25Q256JV.contains(W25Q256JV.size, 1));
        assert!(!W25Q256JV.contains(u32::MAX, 2)); // offset + len overflows
    }

    /// The chip-erase budget must dwarf the sector budget — the driver picks
    /// the poll deadline per erase kind, and mixing them up would either
    /// abort healthy chip erases or stall for minutes on a dead sector.
    #[test]
    fn test_erase_budgets_ordered() {
        assert!(W25Q256JV.sector_erase_ms < W25Q256JV.block_erase_ms);
        assert!(W25Q256JV.block_erase_ms < W25Q256JV.chip_erase_ms);
    }
}
